use std::collections::BTreeSet;

use drillbook::composer::{SessionComposer, StartSessionInput};
use drillbook::db::Database;
use drillbook::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn drill_input(name: &str, component: &str, minutes: u32) -> CreateDrillInput {
    CreateDrillInput {
        name: name.to_string(),
        component: component.to_string(),
        duration_minutes: minutes,
        difficulty: Difficulty::Beginner,
        skill_focus: BTreeSet::new(),
        equipment: BTreeSet::new(),
    }
}

fn tags(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Build a two-component session with a few drills and return its view.
fn composed_view(db: &Database) -> drillbook::composer::SessionView {
    let rondo = db.create_drill(drill_input("Rondo", "Passing", 10)).expect("Failed to create drill");
    let finishing = db.create_drill(drill_input("Finishing", "Shooting", 15)).expect("Failed to create drill");

    let mut composer = SessionComposer::start(
        StartSessionInput {
            total_duration: 45,
            player_count: 12,
            components: vec!["Passing".to_string(), "Shooting".to_string()],
        },
        db.clone(),
    )
    .expect("Failed to start session");

    composer.add_drill("Passing", rondo.clone()).unwrap();
    composer.add_drill("Passing", rondo).unwrap();
    composer.add_drill("Shooting", finishing).unwrap();
    composer.increase("Shooting").unwrap();
    composer.snapshot()
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "drills" {
        describe "create_drill" {
            it "stores all fields" {
                let drill = db.create_drill(CreateDrillInput {
                    name: "Rondo 4v2".to_string(),
                    component: "Passing".to_string(),
                    duration_minutes: 12,
                    difficulty: Difficulty::Advanced,
                    skill_focus: tags(&["first touch", "scanning"]),
                    equipment: tags(&["cones", "bibs"]),
                }).expect("Failed to create drill");

                let found = db.get_drill(drill.id).expect("Query failed").expect("Drill missing");
                assert_eq!(found, drill);
                assert_eq!(found.difficulty, Difficulty::Advanced);
                assert!(found.equipment.contains("bibs"));
            }

            it "rejects a zero duration" {
                let err = db.create_drill(drill_input("Nothing", "Passing", 0)).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
            }

            it "rejects a blank component" {
                let err = db.create_drill(drill_input("Rondo", "  ", 5)).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
            }
        }

        describe "query_drills" {
            it "matches components exactly ignoring case" {
                db.create_drill(drill_input("Triangle", "Passing", 10)).unwrap();
                db.create_drill(drill_input("Warmup rondo", "Passing Warmup", 10)).unwrap();
                db.create_drill(drill_input("Long balls", "PASSING", 10)).unwrap();

                let drills = db.query_drills(&DrillQuery::for_component("passing")).expect("Query failed");
                let names: Vec<_> = drills.iter().map(|d| d.name.as_str()).collect();
                assert_eq!(names, vec!["Long balls", "Triangle"]);

                let none = db.query_drills(&DrillQuery::for_component("Pass")).expect("Query failed");
                assert!(none.is_empty());
            }

            it "folds non-ascii case the same way as the adapter" {
                db.create_drill(drill_input("Überzahl", "ÜBERZAHL", 10)).unwrap();
                let drills = db.query_drills(&DrillQuery::for_component("überzahl")).expect("Query failed");
                assert_eq!(drills.len(), 1);
            }

            it "filters by difficulty" {
                let mut hard = drill_input("Pressing", "Defending", 20);
                hard.difficulty = Difficulty::Elite;
                db.create_drill(hard).unwrap();
                db.create_drill(drill_input("Jockeying", "Defending", 10)).unwrap();

                let drills = db
                    .query_drills(&DrillQuery::for_component("Defending").with_difficulty(Some(Difficulty::Elite)))
                    .expect("Query failed");
                assert_eq!(drills.len(), 1);
                assert_eq!(drills[0].name, "Pressing");
            }

            it "returns everything without filters" {
                db.create_drill(drill_input("A", "Passing", 10)).unwrap();
                db.create_drill(drill_input("B", "Shooting", 10)).unwrap();
                assert_eq!(db.query_drills(&DrillQuery::default()).unwrap().len(), 2);
            }
        }

        describe "import_drills" {
            it "imports all drills in one go" {
                let count = db.import_drills(vec![
                    drill_input("A", "Passing", 10),
                    drill_input("B", "Passing", 5),
                ]).expect("Import failed");
                assert_eq!(count, 2);
                assert_eq!(db.query_drills(&DrillQuery::for_component("Passing")).unwrap().len(), 2);
            }

            it "imports nothing when one drill is invalid" {
                let result = db.import_drills(vec![
                    drill_input("A", "Passing", 10),
                    drill_input("B", "Passing", 0),
                ]);
                assert!(result.is_err());
                assert!(db.query_drills(&DrillQuery::default()).unwrap().is_empty());
            }
        }

        describe "delete_drill" {
            it "returns false for unknown drills" {
                assert!(!db.delete_drill(Uuid::new_v4()).expect("Delete failed"));
            }
        }
    }

    describe "sessions" {
        describe "save_session" {
            it "persists allocations and drills in order" {
                let view = composed_view(&db);
                let saved = db.save_session(SaveSessionInput {
                    name: "  Tuesday U12  ".to_string(),
                    view: view.clone(),
                }).expect("Failed to save session");

                assert_eq!(saved.name, "Tuesday U12");
                assert_eq!(saved.planned_total, 49);
                assert_eq!(saved.player_count, 12);

                let loaded = db.get_session(saved.id).expect("Query failed").expect("Session missing");
                assert_eq!(loaded.id, saved.id);
                assert_eq!(loaded.components, saved.components);
                assert_eq!(loaded.components[0].component, "Passing");
                assert_eq!(loaded.components[0].allocated_minutes, 22);
                assert_eq!(loaded.components[0].drills.len(), 2);
                assert_eq!(loaded.components[0].time_used, 20);
                assert_eq!(loaded.components[1].allocated_minutes, 27);
                assert_eq!(loaded.components[1].time_used, 15);
            }

            it "keeps drill snapshots after catalog deletion" {
                let view = composed_view(&db);
                let drill_id = view.components[1].assignments[0].drill.id;
                let saved = db.save_session(SaveSessionInput { name: "Friday".to_string(), view }).unwrap();

                assert!(db.delete_drill(drill_id).unwrap());

                let loaded = db.get_session(saved.id).unwrap().unwrap();
                assert_eq!(loaded.components[1].drills[0].name, "Finishing");
            }

            it "rejects a blank name" {
                let view = composed_view(&db);
                let err = db.save_session(SaveSessionInput { name: " ".to_string(), view }).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
                assert!(db.list_sessions().unwrap().is_empty());
            }

            it "rejects a view whose total was tampered with" {
                let mut view = composed_view(&db);
                view.planned_total += 5;
                let err = db.save_session(SaveSessionInput { name: "Bad".to_string(), view }).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
            }

            it "rejects a drill without a positive duration" {
                let mut view = composed_view(&db);
                view.components[0].assignments[0].drill.duration_minutes = 0;
                let err = db.save_session(SaveSessionInput { name: "Bad".to_string(), view }).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
                assert!(db.list_sessions().unwrap().is_empty());
            }

            it "rejects allocations below the floor" {
                let mut view = composed_view(&db);
                view.components[0].allocated_minutes = 3;
                view.planned_total = view.components.iter().map(|c| c.allocated_minutes).sum();
                let err = db.save_session(SaveSessionInput { name: "Bad".to_string(), view }).unwrap_err();
                assert!(err.downcast_ref::<ValidationError>().is_some());
            }
        }

        describe "get_session" {
            it "returns None for non-existent session" {
                assert!(db.get_session(Uuid::new_v4()).expect("Query failed").is_none());
            }
        }

        describe "list_sessions" {
            it "summarizes saved sessions" {
                let view = composed_view(&db);
                db.save_session(SaveSessionInput { name: "Monday".to_string(), view }).unwrap();

                let sessions = db.list_sessions().expect("Query failed");
                assert_eq!(sessions.len(), 1);
                assert_eq!(sessions[0].name, "Monday");
                assert_eq!(sessions[0].component_count, 2);
                assert_eq!(sessions[0].total_duration, 45);
            }
        }

        describe "delete_session" {
            it "removes the session and its components" {
                let view = composed_view(&db);
                let saved = db.save_session(SaveSessionInput { name: "Gone".to_string(), view }).unwrap();

                assert!(db.delete_session(saved.id).expect("Delete failed"));
                assert!(db.get_session(saved.id).unwrap().is_none());
                assert!(!db.delete_session(saved.id).unwrap());
            }
        }
    }
}
