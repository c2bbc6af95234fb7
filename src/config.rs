/// Engine configuration loaded from TOML
///
/// ```toml
/// game_id = "gk1"
/// stack_size = 1024
/// legacy_pointer_comparison = true
/// log_filter = "info"
///
/// [[workaround]]
/// game_id = "gk1"
/// room = 800
/// script = 64992
/// object = "Fwd"
/// method = "doit"
/// operation = "comparison"
/// fake = 1
/// ```
use crate::error::ConfigError;
use crate::workaround::{PointerIntegerComparison, WorkaroundChain, WorkaroundEntry, WorkaroundTable};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_STACK_SIZE: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub game_id: String,
    /// Maximum depth of the value stack
    pub stack_size: usize,
    /// Order pointers above small numbers instead of failing the comparison
    pub legacy_pointer_comparison: bool,
    /// env_logger filter used by the command line tool
    pub log_filter: String,
    #[serde(rename = "workaround")]
    pub workarounds: Vec<WorkaroundEntry>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            game_id: String::new(),
            stack_size: DEFAULT_STACK_SIZE,
            legacy_pointer_comparison: false,
            log_filter: "warn".to_string(),
            workarounds: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_size == 0 {
            return Err(ConfigError::Invalid("stack_size must be greater than zero".to_string()));
        }
        if let Some(entry) = self.workarounds.iter().find(|entry| entry.game_id.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "workaround for {}::{} has no game_id",
                entry.object, entry.method
            )));
        }
        Ok(())
    }

    /// The configured workaround policy: the legacy pointer rule (when
    /// enabled) ahead of the workaround table
    pub fn build_policy(&self) -> WorkaroundChain {
        let mut chain = WorkaroundChain::new();
        if self.legacy_pointer_comparison {
            chain = chain.with(PointerIntegerComparison);
        }
        chain.with(WorkaroundTable::new(self.workarounds.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::{make_reg, TRUE_REG};
    use crate::workaround::{CallSite, Operation, WorkaroundPolicy};
    use test_log::test;

    const SAMPLE: &str = r#"
        game_id = "iceman"
        stack_size = 64
        legacy_pointer_comparison = true

        [[workaround]]
        game_id = "iceman"
        room = 199
        script = 977
        object = "Grooper"
        method = "doit"
        operation = "addition"
        fake = 0
    "#;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert!(!config.legacy_pointer_comparison);
        assert!(config.workarounds.is_empty());
    }

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.game_id, "iceman");
        assert_eq!(config.stack_size, 64);
        assert_eq!(config.workarounds.len(), 1);
        assert_eq!(config.workarounds[0].operation, Some(Operation::Addition));
        assert_eq!(config.workarounds[0].room, Some(199));
    }

    #[test]
    fn test_policy_from_config() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let policy = config.build_policy();
        assert_eq!(policy.len(), 2);

        let add = CallSite::new("iceman", 199, 977, "Grooper", "doit").for_operation(Operation::Addition);
        assert_eq!(policy.resolve(make_reg(2, 0), make_reg(3, 0), &add), Some(make_reg(0, 0)));

        let cmp = CallSite::new("iceman", 1, 1, "", "").for_operation(Operation::Comparison);
        assert_eq!(policy.resolve(make_reg(2, 0), make_reg(0, 3), &cmp), Some(TRUE_REG));
    }

    #[test]
    fn test_fake_values_cover_both_signs() {
        let config = EngineConfig::from_toml_str(
            "[[workaround]]\ngame_id = \"a\"\nfake = 65535\n\n[[workaround]]\ngame_id = \"b\"\nfake = -1\n",
        )
        .unwrap();
        assert_eq!(config.workarounds[0].fake, 0xFFFF);
        assert_eq!(config.workarounds[1].fake, 0xFFFF);
        assert_eq!(config.workarounds[0].solution(), make_reg(0, 0xFFFF));

        for out_of_range in ["65536", "-32769"] {
            let text = format!("[[workaround]]\ngame_id = \"a\"\nfake = {}\n", out_of_range);
            assert!(matches!(EngineConfig::from_toml_str(&text), Err(ConfigError::Parse(_))));
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("stack_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[[workaround]]\ngame_id = \"\"\nfake = 1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[[workaround]]\ngame_id = \"x\"\noperation = \"teleport\"\nfake = 1\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("segvm-config-that-does-not-exist.toml");
        assert!(matches!(EngineConfig::load(path), Err(ConfigError::Io { .. })));
    }
}
