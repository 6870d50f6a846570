use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Per-guild allow-list controlling whether the tracker is active.
/// Mirrored to a JSON file (a flat array of guild ids) on every mutation;
/// a missing or unreadable file at startup is an empty set.
pub struct ScopeGate {
    active: BTreeSet<String>,
    path: PathBuf,
}

impl ScopeGate {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let active: BTreeSet<String> = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();

        if active.is_empty() {
            tracing::info!("no active guilds loaded from {}", path.display());
        } else {
            tracing::info!("loaded {} active guild(s)", active.len());
        }

        Self { active, path }
    }

    pub fn is_active(&self, guild_id: &str) -> bool {
        self.active.contains(guild_id)
    }

    /// Add a guild and rewrite the backing file. Activating an
    /// already-active guild is a no-op and skips the rewrite.
    pub fn activate(&mut self, guild_id: &str) -> Result<()> {
        if !self.active.insert(guild_id.to_string()) {
            return Ok(());
        }
        self.persist()
    }

    /// Remove a guild and rewrite the backing file. Deactivating an
    /// inactive guild is a no-op and skips the rewrite.
    pub fn deactivate(&mut self, guild_id: &str) -> Result<()> {
        if !self.active.remove(guild_id) {
            return Ok(());
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let ids: Vec<&String> = self.active.iter().collect();
        let content = serde_json::to_string_pretty(&ids)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let gate = ScopeGate::load(dir.path().join("active.json"));
        assert!(!gate.is_active("g1"));
    }

    #[test]
    fn unparsable_file_is_an_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");
        fs::write(&path, "not json at all").unwrap();

        let gate = ScopeGate::load(&path);
        assert!(!gate.is_active("g1"));
    }

    #[test]
    fn activate_persists_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");

        let mut gate = ScopeGate::load(&path);
        gate.activate("g1").unwrap();
        assert!(gate.is_active("g1"));

        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["g1"]);
    }

    #[test]
    fn deactivate_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");

        let mut gate = ScopeGate::load(&path);
        gate.activate("g1").unwrap();
        gate.activate("g2").unwrap();
        gate.deactivate("g1").unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["g2"]);
        assert!(!gate.is_active("g1"));
        assert!(gate.is_active("g2"));
    }

    #[test]
    fn redundant_toggles_skip_the_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");

        let mut gate = ScopeGate::load(&path);
        gate.deactivate("g1").unwrap();
        assert!(!path.exists());

        gate.activate("g1").unwrap();
        let written = fs::metadata(&path).unwrap().modified().unwrap();
        gate.activate("g1").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), written);
    }

    #[test]
    fn survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");

        let mut gate = ScopeGate::load(&path);
        gate.activate("g2").unwrap();
        gate.activate("g1").unwrap();

        let reloaded = ScopeGate::load(&path);
        assert!(reloaded.is_active("g1"));
        assert!(reloaded.is_active("g2"));
        assert!(!reloaded.is_active("g3"));
    }
}
