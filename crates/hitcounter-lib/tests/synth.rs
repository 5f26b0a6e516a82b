mod common;

use std::fs;

use serde_json::Value;
use tempfile::TempDir;

use hitcounter_lib::assembly::MANIFEST_FILE;
use hitcounter_lib::{App, Code, Error, Function, FunctionProps, Runtime, Template};

use common::{default_workshop, empty_stack, plain_function, synth};

#[test]
fn role_from_another_stack_is_unresolved() {
    let mut producer = empty_stack("Producer");
    let shared = plain_function(&mut producer, "Shared");

    let mut consumer = empty_stack("Consumer");
    let function = {
        let mut root = consumer.root();
        Function::new(
            &mut root,
            "Borrower",
            FunctionProps {
                runtime: Runtime::Nodejs18x,
                code: Code::asset("lambda"),
                handler: "index.handler".to_string(),
                role: shared.role().clone(),
                environment: Default::default(),
            },
        )
        .expect("declaration does not check references")
    };

    match consumer.synthesize() {
        Err(Error::UnresolvedReference { source_id, target }) => {
            assert_eq!(source_id, function.logical_id());
            assert_eq!(target, shared.role().logical_id());
        }
        other => panic!("expected unresolved reference, got {other:?}"),
    }

    let mut app = App::new();
    app.add_stack(producer).expect("producer added");
    app.add_stack(consumer).expect("consumer added");
    assert!(matches!(app.synth(), Err(Error::UnresolvedReference { .. })));
}

#[test]
fn self_invoke_grant_is_a_dependency_cycle() {
    let mut stack = empty_stack("Loop");
    let function = plain_function(&mut stack, "Looper");
    {
        let mut root = stack.root();
        function
            .grant_invoke(&mut root, &function)
            .expect("grant declares");
    }

    match stack.synthesize() {
        Err(Error::DependencyCycle { cycle }) => {
            assert!(cycle.iter().any(|id| id == function.logical_id()));
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("expected dependency cycle, got {other:?}"),
    }
}

#[test]
fn logical_ids_are_stable_across_builds() {
    let first = default_workshop();
    let second = default_workshop();
    assert_eq!(
        first.hit_counter().table().logical_id(),
        second.hit_counter().table().logical_id()
    );
    let ids = |template: &Template| template.resources.keys().cloned().collect::<Vec<_>>();
    assert_eq!(ids(&synth(first.stack())), ids(&synth(second.stack())));

    let table_id = first.hit_counter().table().logical_id();
    assert!(table_id.starts_with("HelloHitCounterHits"));
    assert_eq!(table_id.len(), "HelloHitCounterHits".len() + 8);
    assert!(table_id["HelloHitCounterHits".len()..]
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
}

#[test]
fn every_resource_records_its_construct_path() {
    let workshop = default_workshop();
    let template = synth(workshop.stack());
    for (id, resource) in &template.resources {
        let path = resource["Metadata"]["aws:cdk:path"]
            .as_str()
            .unwrap_or_else(|| panic!("{id} has no construct path"));
        assert!(path.starts_with("CdkWorkshopStack/"));
    }
}

#[test]
fn duplicate_stack_names_are_rejected() {
    let mut app = App::new();
    app.add_stack(empty_stack("Same")).expect("first stack added");
    assert!(matches!(
        app.add_stack(empty_stack("Same")),
        Err(Error::DuplicateConstructId { .. })
    ));
    assert_eq!(app.stacks().len(), 1);
}

#[test]
fn assembly_writes_template_and_manifest() {
    let mut app = App::new();
    app.add_stack(default_workshop().into_stack())
        .expect("stack added");
    let assembly = app.synth().expect("app synthesizes");

    let dir = TempDir::new().expect("create temp dir");
    let out = dir.path().join("cdk.out");
    let written = assembly.write_to(&out).expect("assembly written");
    assert_eq!(written.len(), 2);

    let template_path = out.join("CdkWorkshopStack.template.json");
    let template: Template =
        serde_json::from_str(&fs::read_to_string(&template_path).expect("read template"))
            .expect("template parses");
    assert_eq!(template.count_of_type("AWS::DynamoDB::Table"), 1);

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).expect("read manifest"))
            .expect("manifest parses");
    let artifact = &manifest["artifacts"]["CdkWorkshopStack"];
    assert_eq!(manifest["version"], "1.0.0");
    assert_eq!(artifact["type"], "aws:cloudformation:stack");
    assert_eq!(artifact["environment"], "aws://unknown-account/unknown-region");
    assert_eq!(
        artifact["properties"]["templateFile"],
        "CdkWorkshopStack.template.json"
    );
    assert_eq!(artifact["properties"]["tags"]["lm_app_env"], "sandbox");
    let assets = artifact["metadata"]["/CdkWorkshopStack"]
        .as_array()
        .expect("asset metadata");
    assert_eq!(assets.len(), 2);
    assert!(assets
        .iter()
        .all(|entry| entry["type"] == "aws:cdk:asset" && entry["data"]["packaging"] == "zip"));
}
