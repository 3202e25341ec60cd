//! Target-language evaluation: a Pulumi-style TypeScript program evaluated
//! into a [`ResourceGraph`].
//!
//! `new aws.ec2.Instance("web", {...})` declares a resource and yields a
//! handle whose attributes are symbolic references, so the program can be
//! compared against its HCL counterpart without running any provider.

pub mod ast;
mod builtins;
mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{js_to_string, snake_case, snake_key, truthy, Global, Namespace, Runtime, TargetEvaluator};
pub use parser::parse_program;

use crate::bindings::BindingContext;
use crate::errors::EvalError;
use crate::graph::ResourceGraph;
use crate::provider::ProviderSchema;

pub fn evaluate(
    source: &str,
    bindings: &BindingContext,
    schema: &ProviderSchema,
) -> Result<ResourceGraph, EvalError> {
    let program = parse_program(source)?;
    TargetEvaluator::new(bindings, schema).run(&program)
}

#[cfg(test)]
mod tests {
    use kit::helpers::location::Position;
    use kit::indexmap::indexmap;
    use kit::{indoc, ResourceId, ResourceRef, Value};
    use test_case::test_case;

    use super::*;
    use crate::errors::ErrorKind;

    fn eval_with(source: &str, bindings: BindingContext) -> Result<ResourceGraph, EvalError> {
        let schema = ProviderSchema::builtin().unwrap();
        evaluate(source, &bindings, &schema)
    }

    fn eval(source: &str) -> Result<ResourceGraph, EvalError> {
        eval_with(source, BindingContext::new())
    }

    fn attr<'g>(graph: &'g ResourceGraph, resource_type: &str, name: &str, key: &str) -> &'g Value {
        &graph.get(&ResourceId::new(resource_type, name)).unwrap().attributes[key]
    }

    #[test_case("privateIp", "private_ip")]
    #[test_case("enableDnsHostnames", "enable_dns_hostnames")]
    #[test_case("cidr_block", "cidr_block")]
    #[test_case("Name", "Name")]
    #[test_case("kubernetes.io/role", "kubernetes.io/role")]
    #[test_case("sslPolicyV2", "ssl_policy_v2")]
    fn test_snake_key(key: &str, expected: &str) {
        assert_eq!(snake_key(key), expected);
    }

    #[test]
    fn test_resources_and_references() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";

            const vpc = new aws.ec2.Vpc("main", { cidrBlock: "10.0.0.0/16", enableDnsHostnames: true });
            const subnet = new aws.ec2.Subnet("a", {
                vpcId: vpc.id,
                cidrBlock: "10.0.1.0/24",
                tags: { Name: `subnet-${vpc.id}` },
            });
            export const subnetId = subnet.id;
        "#})
        .unwrap();

        let vpc = ResourceId::new("aws_vpc", "main");
        let subnet = ResourceId::new("aws_subnet", "a");
        assert_eq!(attr(&graph, "aws_vpc", "main", "enable_dns_hostnames"), &Value::bool(true));
        assert_eq!(
            attr(&graph, "aws_subnet", "a", "vpc_id"),
            &Value::reference(ResourceRef::new(vpc.clone()).attr("id"))
        );
        assert_eq!(
            attr(&graph, "aws_subnet", "a", "tags"),
            &Value::map(indexmap! { "Name".to_string() => Value::string("subnet-${aws_vpc.main.id}") })
        );
        assert!(graph.dependencies_of(&subnet).contains(&vpc));
        assert_eq!(graph.outputs()["subnet_id"], Value::reference(ResourceRef::new(subnet).attr("id")));
        assert!(graph.is_finalized());
    }

    #[test]
    fn test_resource_type_resolution() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";
            import * as random from "@pulumi/random";

            new aws.s3.BucketV2("logs", {});
            new aws.cloudwatch.LogGroup("app", { retentionInDays: 7 });
            new random.RandomPet("pet", {});
        "#})
        .unwrap();
        let ids: Vec<String> = graph.ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["aws_s3_bucket.logs", "aws_log_group.app", "random_random_pet.pet"]);
    }

    #[test]
    fn test_nested_blocks_follow_schema_nesting() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";

            new aws.ec2.Instance("web", {
                ami: "ami-123",
                instanceType: "t3.micro",
                rootBlockDevice: { volumeSize: 20, volumeType: undefined },
                ebsBlockDevice: { deviceName: "/dev/sdb" },
                userData: null,
            });
        "#})
        .unwrap();
        let web = graph.get(&ResourceId::new("aws_instance", "web")).unwrap();
        assert_eq!(
            web.attributes["root_block_device"],
            Value::map(indexmap! { "volume_size".to_string() => Value::number(20.0) })
        );
        assert_eq!(
            web.attributes["ebs_block_device"],
            Value::list(vec![Value::map(indexmap! { "device_name".to_string() => Value::string("/dev/sdb") })])
        );
        assert!(!web.attributes.contains_key("user_data"));
    }

    #[test]
    fn test_config_and_control_flow() {
        let source = indoc! {r#"
            import * as pulumi from "@pulumi/pulumi";
            import * as aws from "@pulumi/aws";

            const cfg = new pulumi.Config();
            const names: string[] = cfg.requireObject("names");
            const count = cfg.getNumber("count") ?? 1;
            const prod = config.env === "prod";

            for (const [i, name] of names.entries()) {
                if (i >= count) {
                    undeclaredResource.create();
                } else {
                    new aws.s3.Bucket(name, {
                        bucket: `${name}-${prod ? "prod" : "dev"}`,
                        acl: prod ? "private" : config.missing?.acl,
                    });
                }
            }
        "#};
        let bindings = BindingContext::new()
            .with("names", Value::list(vec![Value::string("logs"), Value::string("assets")]))
            .with("count", Value::string("2"))
            .with("env", Value::string("prod"));
        let graph = eval_with(source, bindings).unwrap();
        // the untaken branch is never evaluated
        assert_eq!(graph.len(), 2);
        assert_eq!(attr(&graph, "aws_s3_bucket", "assets", "bucket"), &Value::string("assets-prod"));
        assert_eq!(attr(&graph, "aws_s3_bucket", "logs", "acl"), &Value::string("private"));
    }

    #[test]
    fn test_array_and_object_builtins() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";

            const ports = [443, 80, 8080].filter(p => p !== 8080).sort((a, b) => a - b);
            const rules = ports.map((port, i) => ({ fromPort: port, toPort: port, priority: i }));
            const byName = Object.fromEntries(ports.map(p => [`p${p}`, p]));
            const total = ports.reduce((sum, p) => sum + p, 0);

            new aws.ec2.SecurityGroup("web", {
                ingress: rules,
                tags: { ...byName, Total: String(total), Keys: Object.keys(byName).join(",") },
                description: JSON.stringify({ b: 1, a: [true, null] }),
            });
        "#})
        .unwrap();
        let ingress = attr(&graph, "aws_security_group", "web", "ingress").as_list().unwrap();
        assert_eq!(ingress.len(), 2);
        assert_eq!(ingress[0].as_map().unwrap()["from_port"], Value::number(80.0));
        let tags = attr(&graph, "aws_security_group", "web", "tags").as_map().unwrap();
        assert_eq!(tags["p443"], Value::number(443.0));
        assert_eq!(tags["Total"], Value::string("523"));
        assert_eq!(tags["Keys"], Value::string("p80,p443"));
        assert_eq!(
            attr(&graph, "aws_security_group", "web", "description"),
            &Value::string(r#"{"b":1,"a":[true,null]}"#)
        );
    }

    #[test]
    fn test_functions_closures_and_apply() {
        let graph = eval(indoc! {r#"
            import * as pulumi from "@pulumi/pulumi";
            import * as aws from "@pulumi/aws";

            function bucketName(prefix: string, suffix = "data"): string {
                return `${prefix}-${suffix}`;
            }
            const role = new aws.iam.Role("app", { assumeRolePolicy: "{}" });
            const upper = (s: string) => s.toUpperCase();
            new aws.s3.Bucket("b", {
                bucket: upper(bucketName("app")),
                tags: { Role: pulumi.interpolate`arn:${role.arn}`, Id: role.id.apply(id => `role-${id}`) },
            }, { dependsOn: [role] });
        "#})
        .unwrap();
        let bucket = graph.get(&ResourceId::new("aws_s3_bucket", "b")).unwrap();
        assert_eq!(bucket.attributes["bucket"], Value::string("APP-DATA"));
        assert_eq!(
            bucket.attributes["tags"],
            Value::map(indexmap! {
                "Role".to_string() => Value::string("arn:${aws_iam_role.app.arn}"),
                "Id".to_string() => Value::string("role-${aws_iam_role.app.id}"),
            })
        );
        assert!(bucket.explicit_dependencies.contains(&ResourceId::new("aws_iam_role", "app")));
    }

    #[test]
    fn test_later_object_keys_win() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";
            const base = { Env: "dev", Team: "core" };
            new aws.s3.Bucket("b", { tags: { ...base, Env: "prod" } });
        "#})
        .unwrap();
        assert_eq!(
            attr(&graph, "aws_s3_bucket", "b", "tags"),
            &Value::map(indexmap! {
                "Env".to_string() => Value::string("prod"),
                "Team".to_string() => Value::string("core"),
            })
        );
    }

    #[test]
    fn test_ternaries_are_lazy() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";
            const enabled = false;
            new aws.s3.Bucket("b", { bucket: enabled ? missingName : "fallback" });
        "#})
        .unwrap();
        assert_eq!(attr(&graph, "aws_s3_bucket", "b", "bucket"), &Value::string("fallback"));
    }

    #[test]
    fn test_string_indexing_outside_bounds_is_undefined() {
        let graph = eval(indoc! {r#"
            export const first = "abc"[0];
            export const last = "abc"[-1];
            export const half = "abc"[0.5];
            export const past = "abc"[3];
        "#})
        .unwrap();
        let outputs = graph.outputs();
        assert_eq!(outputs["first"], Value::string("a"));
        assert!(!outputs.contains_key("last") || outputs["last"].is_null());
        assert!(!outputs.contains_key("half") || outputs["half"].is_null());
        assert!(!outputs.contains_key("past") || outputs["past"].is_null());
    }

    #[test]
    fn test_nan_is_not_strictly_equal_to_itself() {
        let graph = eval(indoc! {r#"
            const n = 0 / 0;
            export const same = n === n;
            export const different = n !== n;
        "#})
        .unwrap();
        assert_eq!(graph.outputs()["same"], Value::bool(false));
        assert_eq!(graph.outputs()["different"], Value::bool(true));
    }

    #[test]
    fn test_graph_with_nan_attribute_is_equivalent_to_itself() {
        let graph = eval(indoc! {r#"
            import * as aws from "@pulumi/aws";
            new aws.s3.Bucket("b", { bucket: "x", size: 0 / 0 });
        "#})
        .unwrap();
        let result = crate::checker::compare(&graph, &graph).unwrap();
        assert!(result.equivalent, "{:?}", result.diff);
    }

    #[test_case("const x = ;", ErrorKind::ParseError ; "parse error")]
    #[test_case("import { Bucket } from \"@pulumi/aws\";", ErrorKind::UnsupportedError ; "named import")]
    #[test_case("const x = region;", ErrorKind::UnboundVariableError ; "unbound identifier")]
    #[test_case("const x = config.require(\"region\");", ErrorKind::UnboundVariableError ; "missing config")]
    #[test_case(
        "import * as aws from \"@pulumi/aws\";\nnew aws.s3.Bucket(42, {});",
        ErrorKind::TypeError ;
        "resource name must be a string"
    )]
    #[test_case(
        "import * as aws from \"@pulumi/aws\";\nnew aws.s3.Bucket(\"b\", {});\nnew aws.s3.Bucket(\"b\", {});",
        ErrorKind::DuplicateResourceError ;
        "duplicate resource"
    )]
    #[test_case("const x = null;\nconst y = x.name;", ErrorKind::TypeError ; "member of null")]
    #[test_case(
        "import * as aws from \"@pulumi/aws\";\nconst b = new aws.s3.Bucket(\"b\", {});\nexport const x = b.arn[1.5];",
        ErrorKind::TypeError ;
        "fractional index into resource attribute"
    )]
    #[test_case("export const a = 1;\nexport const a2 = [].reduce((x, y) => x);", ErrorKind::TypeError ; "empty reduce")]
    fn test_evaluation_errors(source: &str, expected: ErrorKind) {
        let err = eval(source).unwrap_err();
        assert_eq!(err.kind(), expected);
        assert!(err.position().is_some(), "missing position for {}", err);
    }

    #[test]
    fn test_error_positions_point_at_the_expression() {
        let err = eval("const a = 1;\nconst b = a + nope;\n").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(2, 15)));
    }
}
