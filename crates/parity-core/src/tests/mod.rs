use kit::indexmap::indexmap;
use kit::{indoc, ResourceId, Value};

use crate::bindings::BindingContext;
use crate::checker::{compare, EquivalenceResult, Strategy};
use crate::graph::ResourceGraph;
use crate::provider::ProviderSchema;
use crate::{evaluate, Language};

fn graphs(hcl: &str, ts: &str, bindings: &BindingContext) -> (ResourceGraph, ResourceGraph) {
    let schema = ProviderSchema::builtin().unwrap();
    let left = evaluate(Language::Hcl, hcl, bindings, &schema).unwrap_or_else(|e| panic!("hcl: {} at {:?}", e, e.position()));
    let right =
        evaluate(Language::TypeScript, ts, bindings, &schema).unwrap_or_else(|e| panic!("ts: {} at {:?}", e, e.position()));
    (left, right)
}

fn check(hcl: &str, ts: &str, bindings: &BindingContext) -> EquivalenceResult {
    let (left, right) = graphs(hcl, ts, bindings);
    compare(&left, &right).unwrap()
}

fn mock_instances() -> Value {
    let instance = |id: &str, ip: &str| {
        Value::map(indexmap! {
            "id".to_string() => Value::string(id),
            "private_ip".to_string() => Value::string(ip),
        })
    };
    Value::list(vec![
        instance("i-0a1", "10.0.1.10"),
        instance("i-0b2", "10.0.1.11"),
        instance("i-0c3", "10.0.2.12"),
    ])
}

#[test]
fn test_for_expression_matches_map_to_map() {
    let bindings = BindingContext::new().with("instances", mock_instances());
    let (left, right) = graphs(
        indoc! {r#"
            variable "instances" {}

            resource "aws_route53_record" "hosts" {
              zone_id = "Z123"
              name    = "hosts.internal"
              type    = "A"
              records = [for i in var.instances : i.private_ip]
              tags    = { for i in var.instances : i.id => i.private_ip }
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";

            const instances = config.requireObject("instances");
            new aws.route53.Record("hosts", {
                zoneId: "Z123",
                name: "hosts.internal",
                type: "A",
                records: instances.map(i => i.privateIp),
                tags: instances.map(i => [i.id, i.privateIp]).toMap(),
            });
        "#},
        &bindings,
    );
    let result = compare(&left, &right).unwrap();
    assert!(result.equivalent, "{:#?}", result.diff);
    assert_eq!(result.strategy, Strategy::SameName);
    let tags = &left.get(&ResourceId::new("aws_route53_record", "hosts")).unwrap().attributes["tags"];
    assert_eq!(tags.as_map().unwrap()["i-0c3"], Value::string("10.0.2.12"));
}

#[test]
fn test_counted_resources_pair_with_renamed_instances() {
    let bindings = BindingContext::new()
        .with("cidr", Value::string("10.0.0.0/16"))
        .with("azs", Value::list(vec![Value::string("us-east-1a"), Value::string("us-east-1b")]));
    let result = check(
        indoc! {r#"
            variable "cidr" {}
            variable "azs" {}

            resource "aws_vpc" "main" {
              cidr_block = var.cidr
              tags = {
                Name = "main"
              }
            }

            resource "aws_subnet" "public" {
              count             = length(var.azs)
              vpc_id            = aws_vpc.main.id
              cidr_block        = "10.0.${count.index}.0/24"
              availability_zone = var.azs[count.index]
              tags = {
                Name = "public-${count.index}"
              }
            }

            output "vpc_id" {
              value = aws_vpc.main.id
            }

            output "subnet_ids" {
              value = aws_subnet.public[*].id
            }
        "#},
        indoc! {r#"
            import * as pulumi from "@pulumi/pulumi";
            import * as aws from "@pulumi/aws";

            const cfg = new pulumi.Config();
            const azs: string[] = cfg.requireObject("azs");

            const vpc = new aws.ec2.Vpc("main", {
                cidrBlock: cfg.require("cidr"),
                tags: { Name: "main" },
            });

            const subnets = azs.map((az, i) => new aws.ec2.Subnet(`public-${i}`, {
                vpcId: vpc.id,
                cidrBlock: `10.0.${i}.0/24`,
                availabilityZone: az,
                tags: { Name: `public-${i}` },
            }));

            export const vpcId = vpc.id;
            export const subnetIds = subnets.map(s => s.id);
        "#},
        &bindings,
    );
    assert!(result.equivalent, "{:#?}", result.diff);
    assert_eq!(result.strategy, Strategy::Search);
    assert!(result
        .pairing
        .contains(&(ResourceId::new("aws_subnet", "public[1]"), ResourceId::new("aws_subnet", "public-1"))));
}

#[test]
fn test_dynamic_blocks_match_mapped_lists() {
    let bindings = BindingContext::new()
        .with("ports", Value::list(vec![Value::number(80.0), Value::number(443.0)]));
    let result = check(
        indoc! {r#"
            variable "ports" {}

            resource "aws_security_group" "web" {
              name = "web"

              dynamic "ingress" {
                for_each = var.ports
                content {
                  from_port   = ingress.value
                  to_port     = ingress.value
                  protocol    = "tcp"
                  cidr_blocks = ["0.0.0.0/0"]
                }
              }

              egress {
                from_port   = 0
                to_port     = 0
                protocol    = "-1"
                cidr_blocks = ["0.0.0.0/0"]
              }
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";

            const ports: number[] = config.requireObject("ports");
            new aws.ec2.SecurityGroup("web", {
                name: "web",
                ingress: ports.map(port => ({
                    fromPort: port,
                    toPort: port,
                    protocol: "tcp",
                    cidrBlocks: ["0.0.0.0/0"],
                })),
                egress: [{ fromPort: 0, toPort: 0, protocol: "-1", cidrBlocks: ["0.0.0.0/0"] }],
            });
        "#},
        &bindings,
    );
    assert!(result.equivalent, "{:#?}", result.diff);
}

#[test]
fn test_conditionals_templates_and_json() {
    let bindings = BindingContext::new().with("env", Value::string("prod"));
    let result = check(
        indoc! {r#"
            variable "env" {}

            locals {
              is_prod = var.env == "prod"
              policy = jsonencode({
                Version   = "2012-10-17"
                Statement = [{ Action = "s3:GetObject", Effect = "Allow" }]
              })
            }

            resource "aws_s3_bucket" "assets" {
              bucket = "assets-${var.env}"
              acl    = local.is_prod ? "private" : "public-read"
              tags = {
                Stage = "%{ if local.is_prod }production%{ else }development%{ endif }"
              }
              versioning {
                enabled = local.is_prod
              }
            }

            resource "aws_s3_bucket_policy" "assets" {
              bucket = aws_s3_bucket.assets.id
              policy = local.policy
            }

            output "bucket_arn" {
              value = aws_s3_bucket.assets.arn
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";

            const env = config.require("env");
            const isProd = env === "prod";

            const assets = new aws.s3.Bucket("assets", {
                bucket: `assets-${env}`,
                acl: isProd ? "private" : "public-read",
                tags: { Stage: isProd ? "production" : "development" },
                versioning: { enabled: isProd },
            });

            new aws.s3.BucketPolicy("assets", {
                bucket: assets.id,
                policy: JSON.stringify({
                    Statement: [{ Action: "s3:GetObject", Effect: "Allow" }],
                    Version: "2012-10-17",
                }),
            });

            export const bucketArn = assets.arn;
        "#},
        &bindings,
    );
    assert!(result.equivalent, "{:#?}", result.diff);
}

#[test]
fn test_grouped_for_expression_matches_reduce() {
    let subnet = |az: &str, id: &str| {
        Value::map(indexmap! { "az".to_string() => Value::string(az), "id".to_string() => Value::string(id) })
    };
    let bindings = BindingContext::new().with(
        "subnets",
        Value::list(vec![subnet("a", "1"), subnet("a", "2"), subnet("b", "3")]),
    );
    let (left, right) = graphs(
        indoc! {r#"
            variable "subnets" {}

            locals {
              by_az = { for s in var.subnets : s.az => s.id... }
            }

            resource "aws_s3_bucket" "index" {
              bucket = "index"
              tags   = local.by_az
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";

            const subnets = config.requireObject("subnets");
            const byAz = subnets.reduce((acc, s) => ({ ...acc, [s.az]: [...(acc[s.az] ?? []), s.id] }), {});
            new aws.s3.Bucket("index", { bucket: "index", tags: byAz });
        "#},
        &bindings,
    );
    assert_eq!(
        left.get(&ResourceId::new("aws_s3_bucket", "index")).unwrap().attributes["tags"],
        Value::map(indexmap! {
            "a".to_string() => Value::list(vec![Value::string("1"), Value::string("2")]),
            "b".to_string() => Value::list(vec![Value::string("3")]),
        })
    );
    assert!(compare(&left, &right).unwrap().equivalent);
}

#[test]
fn test_nulls_laziness_and_explicit_dependencies() {
    let result = check(
        indoc! {r#"
            resource "aws_s3_bucket" "logs" {
              bucket = "logs"
              acl    = null
            }

            resource "aws_instance" "web" {
              ami           = "ami-123"
              instance_type = false ? var.missing : "t3.micro"
              depends_on    = [aws_s3_bucket.logs]
            }

            resource "aws_instance" "none" {
              count         = 0
              ami           = "ami-123"
              instance_type = "t3.micro"
            }

            output "none_ids" {
              value = aws_instance.none[*].id
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";

            const logs = new aws.s3.Bucket("logs", { bucket: "logs", acl: undefined });
            new aws.ec2.Instance("web", {
                ami: "ami-123",
                instanceType: false ? missing : "t3.micro",
            }, { dependsOn: [logs] });

            export const noneIds = [];
        "#},
        &BindingContext::new(),
    );
    assert!(result.equivalent, "{:#?}", result.diff);
}

#[test]
fn test_mismatch_is_a_result_with_a_diff() {
    let result = check(
        indoc! {r#"
            resource "aws_s3_bucket" "b" {
              bucket = "b"
              tags = {
                Name = "left"
              }
            }
        "#},
        indoc! {r#"
            import * as aws from "@pulumi/aws";
            new aws.s3.Bucket("b", { bucket: "b", tags: { Name: "right" } });
            new aws.s3.Bucket("extra", { bucket: "extra" });
        "#},
        &BindingContext::new(),
    );
    assert!(!result.equivalent);
    assert_eq!(result.diff.added, vec![ResourceId::new("aws_s3_bucket", "extra")]);
    assert_eq!(result.diff.changed[0].attributes[0].path, "tags.Name");
}

#[test]
fn test_reevaluation_is_deterministic() {
    let source = indoc! {r#"
        locals {
          names = ["a", "b"]
        }
        resource "aws_s3_bucket" "b" {
          for_each = toset(local.names)
          bucket   = "bucket-${each.key}"
        }
    "#};
    let schema = ProviderSchema::builtin().unwrap();
    let bindings = BindingContext::new();
    let first = evaluate(Language::Hcl, source, &bindings, &schema).unwrap();
    let second = evaluate(Language::Hcl, source, &bindings, &schema).unwrap();
    assert_eq!(first.to_json(), second.to_json());
    assert!(compare(&first, &second).unwrap().equivalent);
}

#[test]
fn test_language_detection() {
    use std::path::Path;
    use std::str::FromStr;

    assert_eq!(Language::from_path(Path::new("main.tf")), Some(Language::Hcl));
    assert_eq!(Language::from_path(Path::new("index.ts")), Some(Language::TypeScript));
    assert_eq!(Language::from_path(Path::new("README.md")), None);
    assert_eq!(Language::from_str("typescript").unwrap(), Language::TypeScript);
    assert_eq!(Language::Hcl.to_string(), "hcl");
}
