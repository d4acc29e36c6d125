mod schema;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::composer::CatalogSource;
use crate::models::*;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "drillbook")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("drillbook.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }

    // ============================================================
    // Drill catalog operations
    // ============================================================

    pub fn create_drill(&self, input: CreateDrillInput) -> Result<Drill> {
        input.validate()?;

        let conn = self.lock()?;
        let drill = insert_drill(&conn, input)?;
        Ok(drill)
    }

    /// Insert many drills atomically. Either all are imported or none.
    pub fn import_drills(&self, inputs: Vec<CreateDrillInput>) -> Result<usize> {
        for (index, input) in inputs.iter().enumerate() {
            input
                .validate()
                .with_context(|| format!("Drill #{} is invalid", index + 1))?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let count = inputs.len();
        for input in inputs {
            insert_drill(&tx, input)?;
        }
        tx.commit()?;

        tracing::info!("Imported {} drills", count);
        Ok(count)
    }

    pub fn get_drill(&self, id: Uuid) -> Result<Option<Drill>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, component, duration_minutes, difficulty, skill_focus, equipment
             FROM drills WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(drill_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Catalog query. The component filter is an exact match on the
    /// normalized component key, never a substring match.
    pub fn query_drills(&self, query: &DrillQuery) -> Result<Vec<Drill>> {
        let mut sql = String::from(
            "SELECT id, name, component, duration_minutes, difficulty, skill_focus, equipment
             FROM drills",
        );
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(component) = &query.component {
            clauses.push("component_key = ?");
            params.push(component_key(component));
        }
        if let Some(difficulty) = query.difficulty {
            clauses.push("difficulty = ?");
            params.push(difficulty.as_str().to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY name, created_at");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let drills = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), drill_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(drills)
    }

    pub fn delete_drill(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM drills WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Saved session operations
    // ============================================================

    /// Persist a composed session view.
    ///
    /// Validation failures are returned as [`ValidationError`] and nothing is
    /// written. The write itself is one transaction.
    pub fn save_session(&self, input: SaveSessionInput) -> Result<SavedSession> {
        input.validate()?;

        let SaveSessionInput { name, view } = input;
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO sessions (id, name, total_duration, player_count, planned_total, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                name.trim(),
                view.total_duration,
                view.player_count,
                view.planned_total,
                now.to_rfc3339(),
            ),
        )?;

        let mut components = Vec::with_capacity(view.components.len());
        for (component_position, component) in view.components.into_iter().enumerate() {
            tx.execute(
                "INSERT INTO session_components (session_id, position, component, allocated_minutes)
                 VALUES (?, ?, ?, ?)",
                (
                    id.to_string(),
                    component_position,
                    &component.component,
                    component.allocated_minutes,
                ),
            )?;

            let mut drills = Vec::with_capacity(component.assignments.len());
            for (position, assignment) in component.assignments.into_iter().enumerate() {
                let drill_json = serde_json::to_string(&assignment.drill)?;
                tx.execute(
                    "INSERT INTO session_drills (session_id, component_position, position, assignment_id, drill)
                     VALUES (?, ?, ?, ?, ?)",
                    (
                        id.to_string(),
                        component_position,
                        position,
                        assignment.id.to_string(),
                        drill_json,
                    ),
                )?;
                drills.push(assignment.drill);
            }

            components.push(SavedComponent {
                time_used: sum_minutes(&drills),
                component: component.component,
                allocated_minutes: component.allocated_minutes,
                drills,
            });
        }

        tx.commit()?;

        tracing::info!(session_id = %id, "Saved session {}", name.trim());

        Ok(SavedSession {
            id,
            name: name.trim().to_string(),
            total_duration: view.total_duration,
            player_count: view.player_count,
            planned_total: view.planned_total,
            components,
            created_at: now,
        })
    }

    pub fn get_session(&self, id: Uuid) -> Result<Option<SavedSession>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, total_duration, player_count, planned_total, created_at
             FROM sessions WHERE id = ?",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut session = SavedSession {
            id: parse_uuid(row.get::<_, String>(0)?),
            name: row.get(1)?,
            total_duration: row.get(2)?,
            player_count: row.get(3)?,
            planned_total: row.get(4)?,
            components: Vec::new(),
            created_at: parse_datetime(row.get::<_, String>(5)?),
        };
        drop(rows);
        drop(stmt);

        let mut stmt = conn.prepare(
            "SELECT position, component, allocated_minutes
             FROM session_components WHERE session_id = ? ORDER BY position",
        )?;
        let components = stmt
            .query_map([id.to_string()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT component_position, drill
             FROM session_drills WHERE session_id = ? ORDER BY component_position, position",
        )?;
        let drill_rows = stmt
            .query_map([id.to_string()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (position, component, allocated_minutes) in components {
            let drills = drill_rows
                .iter()
                .filter(|(p, _)| *p == position)
                .map(|(_, json)| {
                    serde_json::from_str::<Drill>(json).context("Corrupt drill snapshot")
                })
                .collect::<Result<Vec<_>>>()?;

            session.components.push(SavedComponent {
                component,
                allocated_minutes,
                time_used: sum_minutes(&drills),
                drills,
            });
        }

        Ok(Some(session))
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.total_duration, s.player_count, s.planned_total, s.created_at,
                    (SELECT COUNT(*) FROM session_components c WHERE c.session_id = s.id)
             FROM sessions s ORDER BY s.created_at DESC, s.name",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    total_duration: row.get(2)?,
                    player_count: row.get(3)?,
                    planned_total: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                    component_count: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    pub fn delete_session(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM sessions WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }
}

impl CatalogSource for Database {
    async fn query(&self, query: &DrillQuery) -> Result<Vec<Drill>> {
        self.query_drills(query)
    }
}

fn insert_drill(conn: &Connection, input: CreateDrillInput) -> Result<Drill> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let name = input.name.trim().to_string();
    let component = input.component.trim().to_string();

    conn.execute(
        "INSERT INTO drills (id, name, component, component_key, duration_minutes, difficulty, skill_focus, equipment, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            id.to_string(),
            &name,
            &component,
            component_key(&component),
            input.duration_minutes,
            input.difficulty.as_str(),
            serde_json::to_string(&input.skill_focus)?,
            serde_json::to_string(&input.equipment)?,
            now.to_rfc3339(),
        ),
    )?;

    Ok(Drill {
        id,
        name,
        component,
        duration_minutes: input.duration_minutes,
        difficulty: input.difficulty,
        skill_focus: input.skill_focus,
        equipment: input.equipment,
    })
}

fn drill_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Drill> {
    Ok(Drill {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        component: row.get(2)?,
        duration_minutes: row.get(3)?,
        difficulty: Difficulty::normalize(&row.get::<_, String>(4)?),
        skill_focus: parse_tags(row.get::<_, String>(5)?),
        equipment: parse_tags(row.get::<_, String>(6)?),
    })
}

fn sum_minutes(drills: &[Drill]) -> u32 {
    drills
        .iter()
        .fold(0u32, |acc, d| acc.saturating_add(d.duration_minutes))
}

fn parse_tags(s: String) -> BTreeSet<String> {
    serde_json::from_str(&s).unwrap_or_default()
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
