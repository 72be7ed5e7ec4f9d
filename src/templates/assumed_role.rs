//! PL-007: `step_assumed` — the cross-account role a step deployer assumes
//! to act inside a target account.
//!
//! Produces one role descriptor trusted by the `assumable_from` accounts,
//! plus a policy attachment when `assumed_policy_file` is given.

use super::{role_tags, trust_policy, Template, TemplateCall};
use crate::core::error::Error;
use crate::core::types::{DescriptorKind, ResourceDescriptor};

pub const NAME: &str = "step_assumed";

const REQUIRED: &[&str] = &["assumed_role_name", "assumable_from"];

pub fn template() -> Template {
    Template {
        required_keys: REQUIRED,
        generate,
    }
}

/// Account ids become root principal ARNs; full ARNs pass through.
fn principal_arn(account: &str) -> String {
    if account.starts_with("arn:") {
        account.to_string()
    } else {
        format!("arn:aws:iam::{}:root", account)
    }
}

fn generate(call: &TemplateCall) -> Result<Vec<ResourceDescriptor>, Error> {
    let role_name = call.str_value("assumed_role_name")?.to_string();
    let principals: Vec<String> = call
        .list("assumable_from")?
        .iter()
        .map(|account| principal_arn(account))
        .collect();

    let trust = trust_policy(serde_json::json!({ "AWS": principals }));

    let mut descriptors = vec![ResourceDescriptor {
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
    }];

    if call.opt_str("assumed_policy_file")?.is_some() {
        let policy_name = format!("{}-policy", role_name);
        let document = call.render_policy("assumed_policy_file", call.context)?;
        descriptors.push(ResourceDescriptor {
            kind: DescriptorKind::PolicyAttachment,
            name: policy_name.clone(),
            project: call.project.name.clone(),
            environment: call.environment.name.clone(),
            body: serde_json::json!({
                "PolicyName": policy_name,
                "RoleName": role_name,
                "PolicyDocument": document,
            }),
        });
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Context, ContextValue, Environment, Project};
    use indexmap::IndexMap;
    use std::collections::HashMap;
    use std::path::Path;

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

    fn base_context() -> Context {
        let mut context = Context::new();
        context.insert(
            "assumed_role_name".to_string(),
            ContextValue::Str("coinbase-fenrir-assumed".to_string()),
        );
        context.insert(
            "assumable_from".to_string(),
            ContextValue::List(vec!["123456789012".to_string()]),
        );
        context
    }

    #[test]
    fn test_pl007_role_only_without_policy_file() {
        let project = fenrir();
        let environment = development();
        let context = base_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: Path::new("/decl"),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        assert_eq!(descriptors.len(), 1);
        let role = &descriptors[0];
        assert_eq!(role.kind, DescriptorKind::Role);
        assert_eq!(role.name, "coinbase-fenrir-assumed");
        assert_eq!(role.project, "fenrir");
        assert_eq!(role.environment, "development");
    }

    #[test]
    fn test_pl007_trust_principals() {
        let project = fenrir();
        let environment = development();
        let context = base_context();
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: Path::new("/decl"),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        let trust = &descriptors[0].body["AssumeRolePolicyDocument"];
        assert_eq!(trust["Statement"][0]["Action"], "sts:AssumeRole");
        assert_eq!(
            trust["Statement"][0]["Principal"]["AWS"][0],
            "arn:aws:iam::123456789012:root"
        );
    }

    #[test]
    fn test_pl007_single_string_assumable_from() {
        let project = fenrir();
        let environment = development();
        let mut context = base_context();
        context.insert(
            "assumable_from".to_string(),
            ContextValue::Str("210987654321".to_string()),
        );
        let env = HashMap::new();
        let call = TemplateCall {
            template: NAME,
            project: &project,
            environment: &environment,
            context: &context,
            base_dir: Path::new("/decl"),
            env: &env,
        };

        let descriptors = generate(&call).unwrap();
        let trust = &descriptors[0].body["AssumeRolePolicyDocument"];
        assert_eq!(
            trust["Statement"][0]["Principal"]["AWS"][0],
            "arn:aws:iam::210987654321:root"
        );
    }

    #[test]
    fn test_pl007_arn_passthrough() {
        assert_eq!(
            principal_arn("arn:aws:iam::123456789012:role/ci"),
            "arn:aws:iam::123456789012:role/ci"
        );
        assert_eq!(
            principal_arn("123456789012"),
            "arn:aws:iam::123456789012:root"
        );
    }

    #[test]
    fn test_pl007_policy_file_adds_attachment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assumed_policy.json"),
            r#"{
  "Version": "2012-10-17",
  "Statement": [{"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}]
}"#,
        )
        .unwrap();

        let project = fenrir();
        let environment = development();
        let mut context = base_context();
        context.insert(
            "assumed_policy_file".to_string(),
            ContextValue::Str("assumed_policy.json".to_string()),
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
        assert_eq!(descriptors.len(), 2);
        let attachment = &descriptors[1];
        assert_eq!(attachment.kind, DescriptorKind::PolicyAttachment);
        assert_eq!(attachment.name, "coinbase-fenrir-assumed-policy");
        assert_eq!(
            attachment.body["PolicyDocument"]["Statement"][0]["Action"],
            "s3:GetObject"
        );
        assert_eq!(attachment.body["RoleName"], "coinbase-fenrir-assumed");
    }

    #[test]
    fn test_pl007_policy_file_interpolates_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assumed_policy.json"),
            r#"{
  "Version": "2012-10-17",
  "Statement": [{"Effect": "Allow", "Action": "sts:AssumeRole", "Resource": "{{context.assumed_role_name}}"}]
}"#,
        )
        .unwrap();

        let project = fenrir();
        let environment = development();
        let mut context = base_context();
        context.insert(
            "assumed_policy_file".to_string(),
            ContextValue::Str("assumed_policy.json".to_string()),
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
            "coinbase-fenrir-assumed"
        );
    }
}
