// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Discovery Integration Tests
//!
//! Tag-filtered account discovery, fuzzy name resolution, and the full
//! pipeline over dynamically discovered targets.

mod common;

use common::{run_options, source, Fixture};
use secret_sync::infrastructure::discovery::{
    expand_dynamic_targets, AccountDiscovery, TagCombination, TagFilter, TagOperator, DEFAULT_CACHE_TTL,
};
use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::entities::{AccountInfo, DynamicTarget, ImportRef, Operation};
use secret_sync_domain::services::{MatchConfidence, MatchStrategy, NameResolver, NameRules, ResolvedReference};
use secret_sync_domain::value_objects::AccountId;
use std::collections::HashMap;
use std::sync::Arc;

use secret_sync::infrastructure::stores::MemoryAccountDirectory;

fn tagged_account(id: &str, name: &str, tags: &[(&str, &str)]) -> AccountInfo {
    let mut account = AccountInfo::new(AccountId::parse(id).unwrap(), name);
    account.status = Some("ACTIVE".to_string());
    account.tags = Some(
        tags.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    );
    account
}

fn filter(key: &str, values: &[&str], operator: TagOperator) -> TagFilter {
    TagFilter {
        key: key.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
        operator,
    }
}

// Accounts tagged (Env, Team); filters Env=prod AND Team=pf* must match
// exactly one of the three.
#[tokio::test]
async fn test_tag_discovery_and_combination() {
    let directory = MemoryAccountDirectory::new();
    directory.add_account(tagged_account("000000000001", "a1", &[("Env", "prod"), ("Team", "pf")]), None);
    directory.add_account(tagged_account("000000000002", "a2", &[("Env", "prod"), ("Team", "bk")]), None);
    directory.add_account(tagged_account("000000000003", "a3", &[("Env", "dev"), ("Team", "pf")]), None);

    let discovery = AccountDiscovery::new(Arc::new(directory), DEFAULT_CACHE_TTL);
    let template = DynamicTarget {
        name: "by-tag".to_string(),
        ou_ids: vec![],
        recursive: false,
        external_list: None,
        default_imports: vec![],
        region: None,
        secret_prefix: None,
        role_arn_template: None,
    };

    let filters = [
        filter("Env", &["prod"], TagOperator::Equals),
        filter("Team", &["pf*"], TagOperator::Wildcard),
    ];

    let matched = discovery
        .discover(&template, &filters, TagCombination::And, &[], &CancellationToken::unarmed())
        .await
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].name, "a1");

    let either = discovery
        .discover(&template, &filters, TagCombination::Or, &[], &CancellationToken::unarmed())
        .await
        .unwrap();
    assert_eq!(either.len(), 3);
}

#[tokio::test]
async fn test_status_exclusion() {
    let directory = MemoryAccountDirectory::new();
    let mut active = tagged_account("000000000001", "active", &[]);
    active.status = Some("ACTIVE".to_string());
    let mut suspended = tagged_account("000000000002", "suspended", &[]);
    suspended.status = Some("SUSPENDED".to_string());
    directory.add_account(active, None);
    directory.add_account(suspended, None);

    let discovery = AccountDiscovery::new(Arc::new(directory), DEFAULT_CACHE_TTL);
    let template = DynamicTarget {
        name: "all".to_string(),
        ou_ids: vec![],
        recursive: false,
        external_list: None,
        default_imports: vec![],
        region: None,
        secret_prefix: None,
        role_arn_template: None,
    };

    let remaining = discovery
        .discover(
            &template,
            &[],
            TagCombination::And,
            &["suspended".to_string()],
            &CancellationToken::unarmed(),
        )
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "active");
}

// Known account "Data_Engineers_Sandbox": a normalized spelling resolves
// at normalized confidence, a token fragment resolves fuzzily, and a
// 15-digit string falls through to a source-prefix reference.
#[test]
fn test_fuzzy_name_resolution_tiers() {
    let resolver = NameResolver::new(
        NameRules {
            case_insensitive: true,
            strip_prefixes: vec![],
            strip_suffixes: vec![],
            normalize_keys: true,
        },
        MatchStrategy::Fuzzy,
        vec![(
            "Data_Engineers_Sandbox".to_string(),
            AccountId::parse("000000000042").unwrap(),
        )],
    );

    match resolver.resolve("data-engineers-sandbox") {
        ResolvedReference::Account { confidence, .. } => assert_eq!(confidence, MatchConfidence::Normalized),
        other => panic!("expected normalized account match, got {other:?}"),
    }

    match resolver.resolve("dataengineering") {
        ResolvedReference::Account { confidence, name, .. } => {
            assert_eq!(confidence, MatchConfidence::Fuzzy);
            assert_eq!(name, "Data_Engineers_Sandbox");
        }
        other => panic!("expected fuzzy account match, got {other:?}"),
    }

    match resolver.resolve("111111111111111") {
        ResolvedReference::SourcePrefix { reference } => assert_eq!(reference, "111111111111111"),
        other => panic!("expected source-prefix fallthrough, got {other:?}"),
    }
}

// Discovered accounts expand into targets and flow through the whole
// pipeline like static ones.
#[tokio::test]
async fn test_pipeline_over_discovered_targets() {
    let fixture = Fixture::new();
    fixture.seed("kv/base/db", r#"{"host":"h1"}"#);

    let directory = MemoryAccountDirectory::new();
    directory.add_account(tagged_account("000000000007", "Team Seven", &[("Env", "prod")]), Some("ou-prod"));
    directory.add_account(tagged_account("000000000008", "Team Eight", &[("Env", "dev")]), Some("ou-prod"));

    let discovery = AccountDiscovery::new(Arc::new(directory), DEFAULT_CACHE_TTL);
    let template = DynamicTarget {
        name: "prod-accounts".to_string(),
        ou_ids: vec!["ou-prod".to_string()],
        recursive: false,
        external_list: None,
        default_imports: vec![ImportRef::from("base")],
        region: None,
        secret_prefix: None,
        role_arn_template: None,
    };

    let accounts = discovery
        .discover(
            &template,
            &[filter("Env", &["prod"], TagOperator::Equals)],
            TagCombination::And,
            &[],
            &CancellationToken::unarmed(),
        )
        .await
        .unwrap();

    let resolver = NameResolver::new(NameRules::default(), MatchStrategy::Fuzzy, vec![]);
    let targets = expand_dynamic_targets(&template, &accounts, &[], &resolver, &[]);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "Team_Seven");

    let orchestrator = fixture.orchestrator(vec![source("base")], targets, false).unwrap();
    let report = orchestrator.run(&run_options(Operation::Both), &CancellationToken::unarmed()).await.unwrap();
    assert_eq!(report.failed(), 0);

    use secret_sync_domain::stores::TargetStore;
    let store = fixture.target_stores.store("000000000007", None);
    assert!(store.get("db").await.is_ok());
}
