
use crate::{
    Error,
    db::{
        Db, SaveOptions,
        callback::{CallbackOutcome, LifecycleStage, SkipCallbacks},
        selector::Filter,
    },
    fixtures::{doc, test_db},
    model::{HasMany, ModelDef, Registry},
    schema::{FieldDef, validator::IssueKind},
    store::{AccessRules, DocumentStore, memory::MemoryStore},
    value::Value,
};
use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

fn save(record: &mut crate::db::record::Record) -> bool {
    record.save(&SaveOptions::default()).unwrap()
}

// Timestamps have millisecond resolution; space writes apart so ordering
// assertions are deterministic.
fn tick() {
    thread::sleep(Duration::from_millis(5));
}

#[test]
fn build_drops_unknown_keys() {
    let db = test_db();
    let record = db.model("User").unwrap().build(doc(&[
        ("username", Value::from("hans")),
        ("bogus", Value::from("nope")),
    ]));

    assert_eq!(record.get("username"), Some(&Value::from("hans")));
    assert_eq!(record.get("bogus"), None);
    assert!(record.is_new());
}

#[test]
fn built_address_carries_the_declared_defaults() {
    let db = test_db();
    let record = db.model("Address").unwrap().build(doc(&[]));

    let expected = doc(&[
        ("city", Value::from("")),
        ("country", Value::from("Germany")),
        ("note", Value::from("")),
        ("postalCode", Value::from("")),
        ("street", Value::from("")),
        ("userId", Value::Null),
    ]);
    assert_eq!(record.attributes(), expected);
}

#[test]
fn create_then_find_round_trips() {
    let db = test_db();
    let users = db.model("User").unwrap();

    let created = users
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();
    assert!(created.is_persistent());
    assert!(created.get("createdAt").is_some());
    assert!(created.get("updatedAt").is_some());

    let id = created.id().unwrap();
    let found = users
        .find(Filter::eq("id", id.to_value()))
        .unwrap()
        .unwrap();
    assert_eq!(found.get("username"), Some(&Value::from("hans")));
    assert_eq!(found.id().unwrap(), id);
}

#[test]
fn identifier_aliases_resolve_in_selectors() {
    let db = test_db();
    let users = db.model("User").unwrap();
    let created = users
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();

    // `userId` on the User model is an alias for `id`.
    let found = users
        .find(Filter::eq("userId", created.id().unwrap().to_value()))
        .unwrap();
    assert!(found.is_some());
}

#[test]
fn required_field_error_appears_then_clears() {
    let db = test_db();
    let mut record = db.model("User").unwrap().build(doc(&[]));

    assert!(!save(&mut record));
    assert!(record.is_new());
    let errors = record.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].column, "username");
    assert_eq!(errors[0].kind, IssueKind::Required);

    record.set("username", "hans");
    assert!(save(&mut record));
    assert!(record.is_valid());
    assert!(record.is_persistent());
}

#[test]
fn all_validation_failures_accumulate() {
    let db = test_db();
    let mut record = db.model("Profile").unwrap().build(doc(&[
        ("lastname", Value::from("")),
        ("age", Value::from("not a number")),
    ]));

    assert!(!record.validate(&SkipCallbacks::None));
    let columns: Vec<&str> = record.errors().iter().map(|e| e.column.as_str()).collect();
    assert!(columns.contains(&"lastname"));
    assert!(columns.contains(&"age"));
}

fn seed_profiles(db: &Db) {
    let profiles = db.model("Profile").unwrap();
    let people: [(&str, &str, i64); 5] = [
        ("male", "Meier", 25),
        ("male", "Schulz", 30),
        ("female", "Schmidt", 17),
        ("female", "Weber", 30),
        ("female", "Fischer", 40),
    ];
    for (gender, lastname, age) in people {
        profiles
            .create(doc(&[
                ("gender", Value::from(gender)),
                ("lastname", Value::from(lastname)),
                ("age", Value::from(age)),
            ]))
            .unwrap();
    }
}

#[test]
fn named_scopes_compose_by_conjunction() {
    let db = test_db();
    seed_profiles(&db);
    let profiles = db.model("Profile").unwrap();

    let males = profiles.named("males").unwrap();
    assert_eq!(males.count().unwrap(), 2);
    assert_eq!(profiles.named("females").unwrap().count().unwrap(), 3);
    assert_eq!(
        profiles
            .named("young")
            .unwrap()
            .named("females")
            .unwrap()
            .count()
            .unwrap(),
        1
    );
    // Contradictory scopes match nothing.
    assert_eq!(males.named("females").unwrap().count().unwrap(), 0);
    assert_eq!(profiles.named("old").unwrap().count().unwrap(), 4);

    // Narrowing never mutated the receiver.
    assert_eq!(profiles.count().unwrap(), 5);
    assert!(matches!(
        profiles.named("ghosts"),
        Err(Error::UnknownScope { .. })
    ));
}

#[test]
fn reapplying_a_scope_changes_nothing() {
    let db = test_db();
    seed_profiles(&db);
    let males = db.model("Profile").unwrap().named("males").unwrap();
    let twice = males.named("males").unwrap();

    assert_eq!(males.filter(), twice.filter());
    assert_eq!(males.count().unwrap(), twice.count().unwrap());
}

#[test]
fn finds_stay_inside_the_scope() {
    let db = test_db();
    seed_profiles(&db);
    let profiles = db.model("Profile").unwrap();

    let males = profiles.named("males").unwrap();
    assert!(
        males
            .find(Filter::eq("lastname", "Schmidt"))
            .unwrap()
            .is_none()
    );
    let found = males.find(Filter::eq("lastname", "Meier")).unwrap().unwrap();
    assert_eq!(found.get("gender"), Some(&Value::from("male")));

    let heavy = profiles
        .find_all(Filter::gt("age", 18), Default::default())
        .unwrap();
    assert_eq!(heavy.len(), 4);
}

#[test]
fn first_and_last_follow_creation_time() {
    let db = test_db();
    let users = db.model("User").unwrap();
    for name in ["anna", "berta", "clara"] {
        users
            .create(doc(&[("username", Value::from(name))]))
            .unwrap();
        tick();
    }

    let first = users.first().unwrap().unwrap();
    assert_eq!(first.get("username"), Some(&Value::from("anna")));
    let last = users.last().unwrap().unwrap();
    assert_eq!(last.get("username"), Some(&Value::from("clara")));
    assert!(users.has_any().unwrap());
    assert!(!users.is_empty().unwrap());
}

#[test]
fn scope_equalities_seed_built_records() {
    let db = test_db();
    let males = db.model("Profile").unwrap().named("males").unwrap();

    let record = males.build(doc(&[("lastname", Value::from("Meier"))]));
    assert_eq!(record.get("gender"), Some(&Value::from("male")));

    // Explicit attributes override the seeded fragment.
    let record = males.build(doc(&[("gender", Value::from("female"))]));
    assert_eq!(record.get("gender"), Some(&Value::from("female")));
}

#[test]
fn update_merges_and_saves() {
    let db = test_db();
    let users = db.model("User").unwrap();
    let mut record = users
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();

    let committed = record
        .update(
            doc(&[("username", Value::from("peter"))]),
            &SaveOptions::default(),
        )
        .unwrap();
    assert!(committed);

    let found = users
        .find(Filter::eq("id", record.id().unwrap().to_value()))
        .unwrap()
        .unwrap();
    assert_eq!(found.get("username"), Some(&Value::from("peter")));
    assert_eq!(users.count().unwrap(), 1);
}

#[test]
fn touch_keeps_created_at_stable() {
    let db = test_db();
    let mut record = db
        .model("User")
        .unwrap()
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();

    let created = record.get("createdAt").cloned().unwrap();
    let updated = record.get("updatedAt").cloned().unwrap();
    assert_eq!(created, updated);

    tick();
    assert!(save(&mut record));
    assert_eq!(record.get("createdAt"), Some(&created));
    let retouched = record.get("updatedAt").unwrap();
    assert_eq!(retouched.compare(&updated), Some(std::cmp::Ordering::Greater));
}

#[test]
fn belongs_to_assignment_round_trips() {
    let db = test_db();
    let company = db
        .model("Company")
        .unwrap()
        .create(doc(&[]))
        .unwrap();

    let mut user = db
        .model("User")
        .unwrap()
        .build(doc(&[("username", Value::from("hans"))]));
    assert!(user.belongs_to("company").unwrap().is_none());

    user.assign_belongs_to("company", &company).unwrap();
    assert!(save(&mut user));
    assert_eq!(user.get("companyId"), Some(&company.id().unwrap().to_value()));

    let resolved = user.belongs_to("company").unwrap().unwrap();
    assert_eq!(resolved.id(), company.id());

    assert!(matches!(
        user.belongs_to("employer"),
        Err(Error::UnknownRelation { .. })
    ));
}

#[test]
fn has_many_scopes_to_the_owner() {
    let db = test_db();
    let company = db.model("Company").unwrap().create(doc(&[])).unwrap();
    let other = db.model("Company").unwrap().create(doc(&[])).unwrap();

    let users = db.model("User").unwrap();
    for (name, owner) in [("anna", &company), ("berta", &company), ("clara", &other)] {
        let mut user = users.build(doc(&[("username", Value::from(name))]));
        user.assign_belongs_to("company", owner).unwrap();
        assert!(save(&mut user));
        tick();
    }

    let staff = company.has_many("users").unwrap();
    assert_eq!(staff.count().unwrap(), 2);
    assert_eq!(
        staff.first().unwrap().unwrap().get("username"),
        Some(&Value::from("anna"))
    );
    assert_eq!(
        staff.last().unwrap().unwrap().get("username"),
        Some(&Value::from("berta"))
    );

    // An unsaved owner has no identifier, so nothing persisted matches.
    let unsaved = db.model("Company").unwrap().build(doc(&[]));
    assert_eq!(unsaved.has_many("users").unwrap().count().unwrap(), 0);
}

#[test]
fn has_one_returns_the_single_child() {
    let db = test_db();
    let user = db
        .model("User")
        .unwrap()
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();
    assert!(user.has_one("profile").unwrap().is_none());

    let mut profile = db
        .model("Profile")
        .unwrap()
        .build(doc(&[("lastname", Value::from("Meier"))]));
    profile.assign_belongs_to("user", &user).unwrap();
    assert!(save(&mut profile));

    let resolved = user.has_one("profile").unwrap().unwrap();
    assert_eq!(resolved.id(), profile.id());
}

#[test]
fn polymorphic_belongs_to_records_and_prefers_the_model_field() {
    let registry = Registry::new();
    registry.register(ModelDef::define("Company")).unwrap();
    registry
        .register(
            ModelDef::define("User")
                .field("username", FieldDef::text())
                .collection("users"),
        )
        .unwrap();
    registry
        .register(
            ModelDef::define("Comment")
                .field("body", FieldDef::text())
                .belongs_to(
                    "commentable",
                    crate::model::BelongsTo::new().polymorphic().optional(),
                ),
        )
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    for name in ["companies", "users", "comments"] {
        store.collection(name).allow(AccessRules::allow_all());
    }
    let db = Db::new(store, Arc::new(registry));

    let company = db.model("Company").unwrap().create(doc(&[])).unwrap();
    let mut comment = db
        .model("Comment")
        .unwrap()
        .build(doc(&[("body", Value::from("hi"))]));
    comment.assign_belongs_to("commentable", &company).unwrap();
    assert!(save(&mut comment));

    assert_eq!(
        comment.get("commentableModel"),
        Some(&Value::from("Company"))
    );
    let resolved = comment.belongs_to("commentable").unwrap().unwrap();
    assert_eq!(resolved.model_name(), "Company");
    assert_eq!(resolved.id(), company.id());

    // The stored model field survives the round trip.
    let reloaded = db
        .model("Comment")
        .unwrap()
        .find(Filter::eq("id", comment.id().unwrap().to_value()))
        .unwrap()
        .unwrap();
    let resolved = reloaded.belongs_to("commentable").unwrap().unwrap();
    assert_eq!(resolved.model_name(), "Company");
}

#[test]
fn destroy_cascades_through_dependent_relations() {
    let db = test_db();
    let mut user = db
        .model("User")
        .unwrap()
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();

    let mut profile = db
        .model("Profile")
        .unwrap()
        .build(doc(&[("lastname", Value::from("Meier"))]));
    profile.assign_belongs_to("user", &user).unwrap();
    assert!(save(&mut profile));

    let addresses = db.model("Address").unwrap();
    for street in ["Hauptstr. 1", "Nebenstr. 2"] {
        let mut address = addresses.build(doc(&[("street", Value::from(street))]));
        address.assign_belongs_to("user", &user).unwrap();
        assert!(save(&mut address));
    }

    user.destroy(&SkipCallbacks::None).unwrap();
    assert!(user.is_destroyed());
    assert!(user.id().is_none());
    assert_eq!(db.model("User").unwrap().count().unwrap(), 0);
    assert_eq!(db.model("Profile").unwrap().count().unwrap(), 0);
    assert_eq!(db.model("Address").unwrap().count().unwrap(), 0);
}

#[test]
fn destroyed_records_reject_further_operations() {
    let db = test_db();
    let mut user = db
        .model("User")
        .unwrap()
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();
    user.destroy(&SkipCallbacks::None).unwrap();

    assert!(matches!(
        user.save(&SaveOptions::default()),
        Err(Error::DestroyedRecord)
    ));
    assert!(matches!(
        user.destroy(&SkipCallbacks::None),
        Err(Error::DestroyedRecord)
    ));
}

#[test]
fn destroy_all_reports_the_count_and_tolerates_empty_scopes() {
    let db = test_db();
    let users = db.model("User").unwrap();
    assert_eq!(users.destroy_all(&SkipCallbacks::None).unwrap(), 0);

    for name in ["anna", "berta"] {
        users
            .create(doc(&[("username", Value::from(name))]))
            .unwrap();
    }
    assert_eq!(users.destroy_all(&SkipCallbacks::None).unwrap(), 2);
    assert!(users.is_empty().unwrap());
}

#[test]
fn dangling_relations_surface_unregistered_targets() {
    let registry = Registry::new();
    registry
        .register(ModelDef::define("Company").has_many("users", HasMany::new()))
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    store
        .collection("companies")
        .allow(AccessRules::allow_all());
    let db = Db::new(store, Arc::new(registry));

    let dangling = db.registry().dangling_relations();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].target, "User");

    let company = db.model("Company").unwrap().create(doc(&[])).unwrap();
    assert!(matches!(
        company.has_many("users"),
        Err(Error::UnresolvedRelation { .. })
    ));
}

// --- lifecycle callbacks ---

type EventLog = Arc<Mutex<Vec<String>>>;

const ALL_STAGES: [LifecycleStage; 12] = [
    LifecycleStage::BeforeValidation,
    LifecycleStage::AfterValidation,
    LifecycleStage::BeforeCommit,
    LifecycleStage::BeforeSave,
    LifecycleStage::BeforeInsert,
    LifecycleStage::AfterInsert,
    LifecycleStage::BeforeUpdate,
    LifecycleStage::AfterUpdate,
    LifecycleStage::AfterSave,
    LifecycleStage::AfterCommit,
    LifecycleStage::BeforeDestroy,
    LifecycleStage::AfterDestroy,
];

fn logging_db(events: &EventLog, abort_at: Option<LifecycleStage>) -> Db {
    let registry = Registry::new();
    let mut builder = ModelDef::define("Task").field("title", FieldDef::text());
    for stage in ALL_STAGES {
        let events = Arc::clone(events);
        builder = builder.callback(stage, move |_| {
            events.lock().unwrap().push(stage.to_string());
            if abort_at == Some(stage) {
                CallbackOutcome::Abort
            } else {
                CallbackOutcome::Continue
            }
        });
    }
    registry.register(builder).unwrap();

    let store = Arc::new(MemoryStore::new());
    store.collection("tasks").allow(AccessRules::allow_all());

    Db::new(store, Arc::new(registry))
}

#[test]
fn callbacks_run_in_lifecycle_order() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, None);

    let mut record = db.model("Task").unwrap().create(doc(&[])).unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "beforeValidation",
            "afterValidation",
            "beforeCommit",
            "beforeSave",
            "beforeInsert",
            "afterInsert",
            "afterSave",
            "afterCommit",
        ]
    );

    events.lock().unwrap().clear();
    assert!(save(&mut record));
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "beforeValidation",
            "afterValidation",
            "beforeCommit",
            "beforeSave",
            "beforeUpdate",
            "afterUpdate",
            "afterSave",
            "afterCommit",
        ]
    );

    events.lock().unwrap().clear();
    record.destroy(&SkipCallbacks::None).unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec!["beforeCommit", "beforeDestroy", "afterDestroy", "afterCommit"]
    );
}

#[test]
fn a_before_save_abort_stops_the_commit() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeSave));

    let Err(err) = db.model("Task").unwrap().create(doc(&[])) else {
        panic!("expected the save to abort");
    };
    assert!(matches!(err, Error::CallbackAborted(LifecycleStage::BeforeSave)));
    assert_eq!(err.to_string(), "stopped by beforeSave");

    // Nothing reached the store.
    assert_eq!(db.model("Task").unwrap().count().unwrap(), 0);
    assert_eq!(
        events.lock().unwrap().last().map(String::as_str),
        Some("beforeSave")
    );
}

#[test]
fn a_validation_abort_marks_the_record_invalid() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeValidation));

    let record = db.model("Task").unwrap().create(doc(&[])).unwrap();
    assert!(record.is_new());
    assert!(!record.is_valid());
    assert_eq!(record.errors()[0].to_string(), "base stopped by beforeValidation");
}

#[test]
fn skipped_callbacks_do_not_run() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeSave));

    let options = SaveOptions {
        skip_callbacks: SkipCallbacks::All,
        ..SaveOptions::default()
    };
    let mut record = db.model("Task").unwrap().build(doc(&[]));
    assert!(record.save(&options).unwrap());
    assert!(events.lock().unwrap().is_empty());

    // Skipping just the aborting stage lets the rest run.
    let options = SaveOptions {
        skip_callbacks: SkipCallbacks::stages([LifecycleStage::BeforeSave]),
        ..SaveOptions::default()
    };
    let mut record = db.model("Task").unwrap().build(doc(&[]));
    assert!(record.save(&options).unwrap());
    assert!(!events.lock().unwrap().is_empty());
}

#[test]
fn skip_validation_persists_an_invalid_record() {
    let db = test_db();
    let mut record = db.model("User").unwrap().build(doc(&[]));

    let options = SaveOptions {
        skip_validation: true,
        ..SaveOptions::default()
    };
    assert!(record.save(&options).unwrap());
    assert!(record.is_persistent());
    // The required username was never checked and went out as null.
    assert_eq!(record.get("username"), Some(&Value::Null));
    assert_eq!(db.model("User").unwrap().count().unwrap(), 1);
}

#[test]
fn skip_touch_leaves_the_timestamps_unset() {
    let db = test_db();
    let mut record = db
        .model("User")
        .unwrap()
        .build(doc(&[("username", Value::from("hans"))]));

    let options = SaveOptions {
        skip_touch: true,
        ..SaveOptions::default()
    };
    assert!(record.save(&options).unwrap());
    assert!(record.is_persistent());
    assert_eq!(record.get("createdAt"), None);
    assert_eq!(record.get("updatedAt"), None);
}

#[test]
fn skip_apply_defaults_leaves_declared_defaults_unfilled() {
    let db = test_db();
    // Start below `build`, which fills defaults itself.
    let model = db.registry().expect("Address").unwrap();
    let mut record = crate::db::record::Record::new(db.clone(), Arc::clone(&model));

    let options = SaveOptions {
        skip_apply_defaults: true,
        ..SaveOptions::default()
    };
    assert!(record.save(&options).unwrap());
    assert!(record.is_persistent());
    assert_eq!(record.get("country"), None);

    // The regular save fills the declared default.
    let mut defaulted = crate::db::record::Record::new(db.clone(), model);
    assert!(save(&mut defaulted));
    assert_eq!(defaulted.get("country"), Some(&Value::from("Germany")));
}

#[test]
fn a_before_insert_abort_stops_the_commit() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeInsert));

    let Err(err) = db.model("Task").unwrap().create(doc(&[])) else {
        panic!("expected the insert to abort");
    };
    assert!(matches!(
        err,
        Error::CallbackAborted(LifecycleStage::BeforeInsert)
    ));
    assert_eq!(err.to_string(), "stopped by beforeInsert");
    assert_eq!(db.model("Task").unwrap().count().unwrap(), 0);
}

#[test]
fn a_before_update_abort_stops_the_second_save() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeUpdate));

    // The insert path never reaches beforeUpdate.
    let mut record = db.model("Task").unwrap().create(doc(&[])).unwrap();
    assert!(record.is_persistent());

    let err = record.save(&SaveOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::CallbackAborted(LifecycleStage::BeforeUpdate)
    ));
    assert_eq!(err.to_string(), "stopped by beforeUpdate");
}

#[test]
fn a_before_destroy_abort_keeps_the_record_alive() {
    let events: EventLog = EventLog::default();
    let db = logging_db(&events, Some(LifecycleStage::BeforeDestroy));

    let mut record = db.model("Task").unwrap().create(doc(&[])).unwrap();
    let err = record.destroy(&SkipCallbacks::None).unwrap_err();
    assert!(matches!(
        err,
        Error::CallbackAborted(LifecycleStage::BeforeDestroy)
    ));
    assert_eq!(err.to_string(), "stopped by beforeDestroy");

    // Nothing was removed and the record stays usable.
    assert!(!record.is_destroyed());
    assert!(record.is_persistent());
    assert_eq!(db.model("Task").unwrap().count().unwrap(), 1);
    assert!(record.save(&SaveOptions::default()).unwrap());
}

#[test]
fn has_many_on_an_unsaved_parent_matches_orphaned_children() {
    let db = test_db();
    // An orphan: its companyId was defaulted to null.
    db.model("User")
        .unwrap()
        .create(doc(&[("username", Value::from("hans"))]))
        .unwrap();

    // The unsaved parent has no identifier, so the relation filters on a
    // null foreign key and picks up the orphan.
    let unsaved = db.model("Company").unwrap().build(doc(&[]));
    assert!(unsaved.id().is_none());
    assert_eq!(unsaved.has_many("users").unwrap().count().unwrap(), 1);

    // A persisted parent matches only its own children.
    let saved = db.model("Company").unwrap().create(doc(&[])).unwrap();
    assert_eq!(saved.has_many("users").unwrap().count().unwrap(), 0);
}

#[test]
fn storage_denials_fold_into_the_issue_list() {
    let db = test_db();
    db.store()
        .collection("users")
        .deny(AccessRules::new().insert(|_| true));

    let mut record = db
        .model("User")
        .unwrap()
        .build(doc(&[("username", Value::from("hans"))]));
    assert!(!save(&mut record));
    assert!(record.is_new());
    assert_eq!(record.errors().len(), 1);
    assert_eq!(record.errors()[0].column, "base");
    assert!(matches!(record.errors()[0].kind, IssueKind::Storage(_)));
}
