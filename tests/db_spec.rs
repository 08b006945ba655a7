use modelshare::db::{Database, ShareError};
use modelshare::models::*;
use modelshare::secrets::contains_secret;
use speculate2::speculate;
use uuid::Uuid;

const PLAIN: &str = "sig A {}\nrun {} for 3";
const SECRET: &str = "sig A {}\n//START_SECRET\nsecret\n//END_SECRET\nrun {}";

fn create_seed(db: &Database, code: &str) -> Model {
    db.create_model(CreateModelInput {
        code: code.to_string(),
    })
    .expect("Failed to create seed model")
}

fn share(db: &Database, code: &str, parent: Option<Uuid>) -> ShareResult {
    db.share_model(ShareInput {
        code: code.to_string(),
        current_model_id: parent,
    })
    .expect("Failed to share model")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "models" {
        describe "create_model" {
            it "creates a seed that is its own visibility root" {
                let model = create_seed(&db, PLAIN);

                assert!(model.derivation_of.is_none());
                assert_eq!(model.original, Some(model.id));
                assert!(model.is_visibility_root());
            }
        }

        describe "get_model" {
            it "returns None for non-existent model" {
                let result = db.get_model(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the stored source" {
                let created = create_seed(&db, PLAIN);
                let found = db.get_model(created.id).expect("Query failed").unwrap();
                assert_eq!(found.code, PLAIN);
                assert_eq!(found.original, Some(created.id));
            }
        }

        describe "get_derivations" {
            it "returns direct children only" {
                let seed = create_seed(&db, PLAIN);
                let child = share(&db, PLAIN, Some(seed.id));
                share(&db, PLAIN, Some(child.last_id));

                let derivations = db.get_derivations(seed.id).expect("Query failed");
                assert_eq!(derivations.len(), 1);
                assert_eq!(derivations[0].id, child.last_id);
            }
        }

        describe "get_lineage" {
            it "walks back to the seed" {
                let seed = create_seed(&db, PLAIN);
                let a = share(&db, PLAIN, Some(seed.id));
                let b = share(&db, SECRET, Some(a.last_id));
                let c = share(&db, PLAIN, Some(b.last_id));

                let lineage = db.get_lineage(c.last_id).expect("Query failed");
                let ids: Vec<Uuid> = lineage.iter().map(|m| m.id).collect();
                assert_eq!(ids, vec![c.last_id, b.last_id, a.last_id, seed.id]);
            }

            it "is empty for an unknown model" {
                let lineage = db.get_lineage(Uuid::new_v4()).expect("Query failed");
                assert!(lineage.is_empty());
            }
        }
    }

    describe "share_model" {
        it "creates only a public link for plain code" {
            let seed = create_seed(&db, PLAIN);
            let result = share(&db, PLAIN, Some(seed.id));

            assert!(result.private.is_none());
            let links = db.get_links_for_model(result.last_id).expect("Query failed");
            assert_eq!(links.len(), 1);
            assert_eq!(links[0].id, result.public);
            assert!(!links[0].private);
        }

        it "creates a public and a private link for secret code" {
            let seed = create_seed(&db, PLAIN);
            let result = share(&db, SECRET, Some(seed.id));

            let private = result.private.expect("private link expected");
            let links = db.get_links_for_model(result.last_id).expect("Query failed");
            assert_eq!(links.len(), 2);
            assert_eq!(links[0].id, result.public);
            assert_eq!(links[1].id, private);
            assert!(links[1].private);
        }

        it "makes a secret model its own visibility root" {
            let seed = create_seed(&db, PLAIN);
            let result = share(&db, SECRET, Some(seed.id));

            let model = db.get_model(result.last_id).expect("Query failed").unwrap();
            assert_eq!(model.original, Some(result.last_id));
            assert_eq!(model.derivation_of, Some(seed.id));
        }

        it "inherits the nearest secret ancestor as root" {
            let seed = create_seed(&db, PLAIN);
            let secret = share(&db, SECRET, Some(seed.id));
            let plain = share(&db, PLAIN, Some(secret.last_id));
            let deeper = share(&db, PLAIN, Some(plain.last_id));

            let plain_model = db.get_model(plain.last_id).expect("Query failed").unwrap();
            let deeper_model = db.get_model(deeper.last_id).expect("Query failed").unwrap();
            assert_eq!(plain_model.original, Some(secret.last_id));
            assert_eq!(deeper_model.original, Some(secret.last_id));
        }

        it "keeps the invariant along a mixed chain" {
            let seed = create_seed(&db, PLAIN);
            let sources = [PLAIN, SECRET, PLAIN, PLAIN, SECRET, PLAIN];
            let mut parent = seed.id;

            for code in sources {
                let result = share(&db, code, Some(parent));
                let model = db.get_model(result.last_id).expect("Query failed").unwrap();
                let parent_model = db.get_model(parent).expect("Query failed").unwrap();

                if contains_secret(&model.code) {
                    assert_eq!(model.original, Some(model.id));
                    assert!(result.private.is_some());
                } else {
                    assert_eq!(model.original, parent_model.original);
                    assert!(result.private.is_none());
                }
                parent = result.last_id;
            }
        }

        it "treats a share without parent as a new root" {
            let result = share(&db, PLAIN, None);
            let model = db.get_model(result.last_id).expect("Query failed").unwrap();
            assert!(model.derivation_of.is_none());
            assert_eq!(model.original, Some(model.id));
        }

        it "fails with DanglingParent and writes nothing" {
            let missing = Uuid::new_v4();
            let result = db.share_model(ShareInput {
                code: PLAIN.to_string(),
                current_model_id: Some(missing),
            });

            assert!(matches!(result, Err(ShareError::DanglingParent(id)) if id == missing));
            assert_eq!(db.count_models().expect("Query failed"), 0);
            assert_eq!(db.count_links().expect("Query failed"), 0);
        }

        it "rejects a secret share whose parent is missing" {
            let missing = Uuid::new_v4();
            let result = db.share_model(ShareInput {
                code: SECRET.to_string(),
                current_model_id: Some(missing),
            });

            assert!(matches!(result, Err(ShareError::DanglingParent(id)) if id == missing));
            assert_eq!(db.count_models().expect("Query failed"), 0);
            assert_eq!(db.count_links().expect("Query failed"), 0);
        }

        it "leaves earlier models untouched when a share is rejected" {
            let seed = create_seed(&db, PLAIN);
            let _ = db.share_model(ShareInput {
                code: PLAIN.to_string(),
                current_model_id: Some(Uuid::new_v4()),
            });

            assert_eq!(db.count_models().expect("Query failed"), 1);
            assert!(db.get_derivations(seed.id).expect("Query failed").is_empty());
        }
    }

    describe "resolve_link" {
        it "returns None for an unknown link" {
            assert!(db.resolve_link(Uuid::new_v4()).expect("Query failed").is_none());
        }

        it "serves full source through the private link" {
            let result = share(&db, SECRET, None);
            let resolved = db.resolve_link(result.private.unwrap()).expect("Query failed").unwrap();

            assert!(resolved.private);
            assert_eq!(resolved.code, SECRET);
        }

        it "serves redacted source through the public link" {
            let result = share(&db, SECRET, None);
            let resolved = db.resolve_link(result.public).expect("Query failed").unwrap();

            assert!(!resolved.private);
            assert!(!resolved.code.contains("secret"));
            assert!(!resolved.code.contains("//START_SECRET"));
            assert!(resolved.code.contains("sig A {}"));
            assert_eq!(resolved.original, Some(result.last_id));
        }
    }

    describe "open" {
        it "persists across reopen of a file database" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("models.db");

            let first = Database::open(path.clone()).expect("Failed to open");
            first.migrate().expect("Failed to migrate");
            let seed = create_seed(&first, PLAIN);
            drop(first);

            let second = Database::open(path).expect("Failed to reopen");
            second.migrate().expect("Failed to migrate");
            assert!(second.get_model(seed.id).expect("Query failed").is_some());
        }
    }
}
