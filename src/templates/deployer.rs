//! PL-008: `bifrost_deployer` — the deployer-side role the step deployer's
//! state machine lambdas run as.
//!
//! Produces the `{org}-{project}-deployer` role trusted by the deployer's
//! service principals, plus a policy attachment rendered from
//! `lambda_policy_file`. A nested `lambda_policy_context` mapping, when
//! given, is merged over the invocation context for rendering.

use super::{role_tags, trust_policy, Template, TemplateCall};
use crate::core::context;
use crate::core::error::Error;
use crate::core::types::{DescriptorKind, ResourceDescriptor};

pub const NAME: &str = "bifrost_deployer";

const REQUIRED: &[&str] = &["lambda_policy_file"];

/// Service principals allowed to assume the deployer role.
const SERVICE_PRINCIPALS: &[&str] = &["lambda.amazonaws.com", "states.amazonaws.com"];

pub fn template() -> Template {
    Template {
        required_keys: REQUIRED,
        generate,
    }
}

fn generate(call: &TemplateCall) -> Result<Vec<ResourceDescriptor>, Error> {
    let role_name = format!("{}-{}-deployer", call.project.org, call.project.name);
    let trust = trust_policy(serde_json::json!({ "Service": SERVICE_PRINCIPALS }));

    let nested = call.map_or_empty("lambda_policy_context")?;
    let render_ctx = context::build(call.context, &nested);
    let document = call.render_policy("lambda_policy_file", &render_ctx)?;

    let policy_name = format!("{}-policy", role_name);
    Ok(vec![
        ResourceDescriptor {
            kind: DescriptorKind::Role,
            name: role_name.clone(),
            project: call.project.name.clone(),
            environment: call.environment.name.clone(),
            body: serde_json::json!({
                "RoleName": role_name,
                "Path": "/",
                "AssumeRolePolicyDocument": trust,
                "Tags": role_tags(call.project, call.environment),
            }),
        },
        ResourceDescriptor {
            kind: DescriptorKind::PolicyAttachment,
            name: policy_name.clone(),
            project: call.project.name.clone(),
            environment: call.environment.name.clone(),
            body: serde_json::json!({
                "PolicyName": policy_name,
                "RoleName": role_name,
                "PolicyDocument": document,
            }),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Context, ContextValue, Environment, Project};
    use indexmap::IndexMap;
    use std::collections::HashMap;

    fn development() -> Environment {
        Environment {
            name: "development".to_string(),
            region: "us-east-1".to_string(),
            account_id: "123456789012".to_string(),
        }
    }

    fn fenrir() -> Project {
        Project {
            name: "fenrir".to_string(),
            org: "coinbase".to_string(),
            environments: vec!["development".to_string()],
            tags: IndexMap::new(),
        }
    }

    fn write_lambda_policy(dir: &std::path::Path) {
        std::fs::write(
            dir.join("lambda_policy.json"),
            r#"{
  "Version": "2012-10-17",
  "Statement": [{
    "Effect": "Allow",
    "Action": "sts:AssumeRole",
    "Resource": "arn:aws:iam::*:role/{{context.assumed_role_name}}"
  }]
}"#,
        )
        .unwrap();
    }

    fn make_context() -> Context {
        let mut nested = Context::new();
        nested.insert(
            "assumed_role_name".to_string(),
            ContextValue::Str("coinbase-fenrir-assumed".to_string()),
        );
        let mut context = Context::new();
        context.insert(
            "lambda_policy_file".to_string(),
            ContextValue::Str("lambda_policy.json".to_string()),
        );
        context.insert("lambda_policy_context".to_string(), ContextValue::Map(nested));
        context
    }

    #[test]
    fn test_pl008_role_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        write_lambda_policy(dir.path());

        let project = fenrir();
        let environment = development();
        let context = make_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: dir.path(),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].kind, DescriptorKind::Role);
        assert_eq!(descriptors[0].name, "coinbase-fenrir-deployer");
        assert_eq!(descriptors[1].kind, DescriptorKind::PolicyAttachment);
        assert_eq!(descriptors[1].name, "coinbase-fenrir-deployer-policy");
    }

    #[test]
    fn test_pl008_service_trust() {
        let dir = tempfile::tempdir().unwrap();
        write_lambda_policy(dir.path());

        let project = fenrir();
        let environment = development();
        let context = make_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: dir.path(),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        let trust = &descriptors[0].body["AssumeRolePolicyDocument"];
        let services = trust["Statement"][0]["Principal"]["Service"]
            .as_array()
            .unwrap();
        assert!(services.contains(&serde_json::json!("lambda.amazonaws.com")));
        assert!(services.contains(&serde_json::json!("states.amazonaws.com")));
    }

    #[test]
    fn test_pl008_nested_context_renders_policy() {
        let dir = tempfile::tempdir().unwrap();
        write_lambda_policy(dir.path());

        let project = fenrir();
        let environment = development();
        let context = make_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: dir.path(),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        assert_eq!(
            descriptors[1].body["PolicyDocument"]["Statement"][0]["Resource"],
            "arn:aws:iam::*:role/coinbase-fenrir-assumed"
        );
    }

    #[test]
    fn test_pl008_nested_context_wins_over_outer() {
        let dir = tempfile::tempdir().unwrap();
        write_lambda_policy(dir.path());

        let project = fenrir();
        let environment = development();
        let mut context = make_context();
        // Outer key with the same name; the nested mapping must win.
        context.insert(
            "assumed_role_name".to_string(),
            ContextValue::Str("outer-name".to_string()),
        );
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: dir.path(),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        assert_eq!(
            descriptors[1].body["PolicyDocument"]["Statement"][0]["Resource"],
            "arn:aws:iam::*:role/coinbase-fenrir-assumed"
        );
    }

    #[test]
    fn test_pl008_missing_policy_file() {
        let dir = tempfile::tempdir().unwrap();
        // No lambda_policy.json written.

        let project = fenrir();
        let environment = development();
        let context = make_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: dir.path(),
            env: &env,
        };

        let err = generate(&call).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
