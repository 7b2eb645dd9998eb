//! Environment-variable lookups shared by the local implementations.
//!
//! Values are trimmed and empty strings count as unset, so `FOO=` in an env file never
//! shadows a default.

pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First set variable among `keys`, in order.
pub fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env(k))
}

pub fn env_usize(key: &str, default: usize) -> usize {
    env(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
}

pub fn env_u64(key: &str, default: u64) -> u64 {
    env(key)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

pub fn env_f32(key: &str, default: f32) -> f32 {
    env(key)
        .and_then(|s| s.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Load `KEY=VALUE` lines from `path` into the process env.
///
/// Blank lines and `#` comments are skipped. Variables already present in the process
/// environment win. Returns the number of variables set.
pub fn load_env_file(path: &std::path::Path) -> std::io::Result<usize> {
    let txt = std::fs::read_to_string(path)?;
    let mut n = 0usize;
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
            n += 1;
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_count_as_unset() {
        std::env::set_var("DOCXMART_TEST_CONFIG_EMPTY", "   ");
        assert_eq!(env("DOCXMART_TEST_CONFIG_EMPTY"), None);
        assert_eq!(env_usize("DOCXMART_TEST_CONFIG_EMPTY", 7), 7);
    }

    #[test]
    fn env_any_prefers_earlier_keys() {
        std::env::set_var("DOCXMART_TEST_CONFIG_A", "a");
        std::env::set_var("DOCXMART_TEST_CONFIG_B", "b");
        assert_eq!(
            env_any(&["DOCXMART_TEST_CONFIG_MISSING", "DOCXMART_TEST_CONFIG_B", "DOCXMART_TEST_CONFIG_A"])
                .as_deref(),
            Some("b")
        );
    }

    #[test]
    fn env_f32_rejects_garbage() {
        std::env::set_var("DOCXMART_TEST_CONFIG_F32", "nan");
        assert_eq!(env_f32("DOCXMART_TEST_CONFIG_F32", 0.25), 0.25);
        std::env::set_var("DOCXMART_TEST_CONFIG_F32", "0.5");
        assert_eq!(env_f32("DOCXMART_TEST_CONFIG_F32", 0.25), 0.5);
    }

    #[test]
    fn env_file_does_not_override_process_env() {
        let dir = std::env::temp_dir().join(format!("docxmart-envfile-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let p = dir.join("test.env");
        std::fs::write(
            &p,
            "# comment\nDOCXMART_TEST_ENVFILE_KEPT=file\n\nDOCXMART_TEST_ENVFILE_NEW=\"quoted\"\nnot a pair\n",
        )
        .unwrap();
        std::env::set_var("DOCXMART_TEST_ENVFILE_KEPT", "process");
        let n = load_env_file(&p).unwrap();
        assert_eq!(n, 1);
        assert_eq!(env("DOCXMART_TEST_ENVFILE_KEPT").as_deref(), Some("process"));
        assert_eq!(env("DOCXMART_TEST_ENVFILE_NEW").as_deref(), Some("quoted"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
