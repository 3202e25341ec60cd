use parity_test_utils::fixtures::{default_bindings, mock_instances};
use parity_test_utils::{
    assert_equivalent, assert_eval_error, assert_not_equivalent, CheckHarness, CheckerConfig, ErrorKind,
    HclBuilder, ResourceId, Strategy, TargetBuilder, Value,
};
use test_case::test_case;

#[test]
fn test_instance_records_from_for_expression_and_to_map() {
    let hcl = HclBuilder::new()
        .variable("instances")
        .resource("aws_route53_record", "hosts")
        .attr("zone_id", "\"Z123\"")
        .attr("name", "\"hosts.internal\"")
        .attr("records", "[for i in var.instances : i.private_ip]")
        .attr("tags", "{ for i in var.instances : i.id => i.private_ip }")
        .build();
    let target = TargetBuilder::new()
        .require_object("instances")
        .anonymous_resource("aws.route53.Record", "\"hosts\"")
        .arg("zoneId", "\"Z123\"")
        .arg("name", "\"hosts.internal\"")
        .arg("records", "instances.map(i => i.privateIp)")
        .arg("tags", "instances.map(i => [i.id, i.privateIp]).toMap()")
        .build();
    let harness = CheckHarness::new(hcl, target).with_binding("instances", mock_instances());
    assert_equivalent!(harness, Strategy::SameName);
}

#[test]
fn test_for_each_map_matches_loop_over_entries() {
    let hcl = HclBuilder::new()
        .locals(vec![("sites", "{ blog = \"private\", docs = \"public-read\" }")])
        .resource("aws_s3_bucket", "site")
        .for_each("local.sites")
        .attr("bucket", "\"${each.key}-site\"")
        .attr("acl", "each.value")
        .output("blog_bucket", "aws_s3_bucket.site[\"blog\"].bucket")
        .build();
    let target = TargetBuilder::new()
        .constant("sites", "{ blog: \"private\", docs: \"public-read\" }")
        .constant(
            "buckets",
            "Object.entries(sites).map(([name, acl]) => new aws.s3.Bucket(`${name}-bucket`, { bucket: `${name}-site`, acl }))",
        )
        .export("blogBucket", "buckets[0].bucket")
        .build();
    let harness = CheckHarness::new(hcl, target);
    let result = harness.run().unwrap();
    assert!(result.equivalent, "{:#?}", result.diff);
    assert_eq!(result.strategy, Strategy::Search);
    assert!(result.pairing.contains(&(
        ResourceId::new("aws_s3_bucket", "site[\"docs\"]"),
        ResourceId::new("aws_s3_bucket", "docs-bucket")
    )));
}

#[test]
fn test_counted_subnets_with_splat_output() {
    let hcl = HclBuilder::new()
        .variable("azs")
        .variable("cidr")
        .resource("aws_vpc", "main")
        .attr("cidr_block", "var.cidr")
        .resource("aws_subnet", "private")
        .count("length(var.azs)")
        .attr("vpc_id", "aws_vpc.main.id")
        .attr("cidr_block", "\"10.0.${count.index}.0/24\"")
        .attr("availability_zone", "var.azs[count.index]")
        .output("subnet_ids", "aws_subnet.private[*].id")
        .build();
    let target = TargetBuilder::new()
        .require("cidr")
        .require_object("azs")
        .resource("vpc", "aws.ec2.Vpc", "\"main\"")
        .arg("cidrBlock", "cidr")
        .constant(
            "subnets",
            "azs.map((az, i) => new aws.ec2.Subnet(`private-${az}`, {\n    vpcId: vpc.id,\n    cidrBlock: `10.0.${i}.0/24`,\n    availabilityZone: az,\n}))",
        )
        .export("subnetIds", "subnets.map(s => s.id)")
        .build();
    let harness = CheckHarness::new(hcl, target).with_bindings(default_bindings());
    assert_equivalent!(harness, Strategy::Search);
}

#[test]
fn test_dynamic_ingress_rules_match_mapped_objects() {
    let hcl = HclBuilder::new()
        .variable("ports")
        .resource("aws_security_group", "web")
        .attr("name", "\"web\"")
        .dynamic(
            "ingress",
            "var.ports",
            vec![
                ("from_port", "ingress.value"),
                ("to_port", "ingress.value"),
                ("protocol", "\"tcp\""),
            ],
        )
        .build();
    let target = |ports: &str| {
        TargetBuilder::new()
            .constant("ports", ports)
            .anonymous_resource("aws.ec2.SecurityGroup", "\"web\"")
            .arg("name", "\"web\"")
            .arg("ingress", "ports.map(p => ({ fromPort: p, toPort: p, protocol: \"tcp\" }))")
            .build()
    };
    let ports = Value::list(vec![Value::number(22.0), Value::number(443.0)]);

    let harness = CheckHarness::new(hcl.clone(), target("[22, 443]")).with_binding("ports", ports.clone());
    assert_equivalent!(harness);

    let harness = CheckHarness::new(hcl, target("[443, 22]")).with_binding("ports", ports);
    assert_not_equivalent!(harness, "ingress[0].from_port");
}

#[test]
fn test_untaken_branches_are_never_evaluated() {
    let hcl = HclBuilder::new()
        .variable("env")
        .resource("aws_instance", "app")
        .attr("ami", "\"ami-123\"")
        .attr("instance_type", "var.env == \"prod\" ? \"m5.large\" : var.dev_size")
        .build();
    let target = TargetBuilder::new()
        .require("env")
        .anonymous_resource("aws.ec2.Instance", "\"app\"")
        .arg("ami", "\"ami-123\"")
        .arg("instanceType", "env === \"prod\" ? \"m5.large\" : config.require(\"devSize\")")
        .build();
    let harness = CheckHarness::new(hcl, target).with_bindings(default_bindings());
    assert_equivalent!(harness);
}

#[test]
fn test_diff_is_symmetric() {
    let hcl = HclBuilder::new()
        .resource("aws_s3_bucket", "logs")
        .attr("bucket", "\"logs\"")
        .resource("aws_s3_bucket", "site")
        .attr("bucket", "\"site\"")
        .attr("tags", "{ Owner = \"web\" }")
        .build();
    let target = TargetBuilder::new()
        .anonymous_resource("aws.s3.Bucket", "\"site\"")
        .arg("bucket", "\"site\"")
        .arg("tags", "{ Owner: \"platform\" }")
        .anonymous_resource("aws.s3.Bucket", "\"archive\"")
        .arg("bucket", "\"archive\"")
        .anonymous_resource("aws.s3.Bucket", "\"cold\"")
        .arg("bucket", "\"cold\"")
        .build();
    let harness = CheckHarness::new(hcl, target);
    let forward = harness.run().unwrap();
    let backward = harness.run_reversed().unwrap();
    assert!(!forward.equivalent);
    assert_eq!(backward.diff, forward.diff.swapped());
    assert!(forward
        .diff
        .changed
        .iter()
        .any(|c| c.attributes.iter().any(|a| a.path == "tags.Owner")));
}

#[test]
fn test_step_budget_applies_to_the_search() {
    let hcl = HclBuilder::new()
        .resource("aws_s3_bucket", "a")
        .attr("bucket", "\"one\"")
        .resource("aws_s3_bucket", "b")
        .attr("bucket", "\"two\"")
        .build();
    let target = TargetBuilder::new()
        .anonymous_resource("aws.s3.Bucket", "\"x\"")
        .arg("bucket", "\"two\"")
        .anonymous_resource("aws.s3.Bucket", "\"y\"")
        .arg("bucket", "\"one\"")
        .build();
    let harness = CheckHarness::new(hcl, target);
    assert_equivalent!(harness.clone(), Strategy::Search);
    assert_eval_error!(
        harness.clone().with_config(CheckerConfig::new().with_step_budget(1)).run(),
        ErrorKind::DeadlineExceededError
    );
    assert_eval_error!(
        harness.with_config(CheckerConfig::new().with_max_resources(1)).run(),
        ErrorKind::TooManyResourcesError
    );
}

#[test_case(
    "locals {\n  by_az = { for s in var.subnets : s.az => s.id }\n}\n",
    ErrorKind::DuplicateKeyError ;
    "for expression without grouping"
)]
#[test_case("locals {\n  x = frobnicate(1)\n}\n", ErrorKind::UnknownFunctionError ; "unknown function")]
#[test_case("locals {\n  x = var.nowhere\n}\n", ErrorKind::UnboundVariableError ; "unbound variable")]
#[test_case("locals {\n  x = 1 / 0\n}\n", ErrorKind::TypeError ; "division by zero")]
#[test_case(
    "resource \"aws_s3_bucket\" \"a\" {}\nresource \"aws_s3_bucket\" \"a\" {}\n",
    ErrorKind::DuplicateDeclarationError ;
    "duplicate resource"
)]
fn test_hcl_evaluation_errors(source: &str, kind: ErrorKind) {
    let harness = CheckHarness::new(HclBuilder::new().variable("subnets").with_content(source).build(), "")
        .with_bindings(default_bindings());
    assert_eval_error!(harness.run(), kind);
}

#[test_case("const x = ;", ErrorKind::ParseError ; "parse error")]
#[test_case("const x = missing;", ErrorKind::UnboundVariableError ; "unbound identifier")]
#[test_case("const x = config.require(\"absent\");", ErrorKind::UnboundVariableError ; "missing config")]
#[test_case("const x = null; const y = x.field;", ErrorKind::TypeError ; "member of null")]
fn test_target_evaluation_errors(source: &str, kind: ErrorKind) {
    let harness = CheckHarness::new("", TargetBuilder::new().statement(source).build());
    assert_eval_error!(harness.run(), kind);
}
