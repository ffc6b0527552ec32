//! Ownership filter for module identifiers

use globset::{Glob, GlobSet, GlobSetBuilder};
use smelt_config::{ConfigResult, PipelineConfig};

/// Decides whether the pipeline owns a module identifier
///
/// An identifier is owned when its path part matches at least one include
/// pattern and no exclude pattern. The query part (`?...`) is ignored, and
/// backslashes are treated as `/`.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    /// Compile include and exclude patterns
    pub fn new(include: &[String], exclude: &[String]) -> ConfigResult<Self> {
        Ok(Self {
            include: build_glob_set(include)?,
            exclude: build_glob_set(exclude)?,
        })
    }

    /// Filter for a pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> ConfigResult<Self> {
        Self::new(&config.include(), &config.exclude)
    }

    /// Whether the pipeline owns `id`
    pub fn matches(&self, id: &str) -> bool {
        let path = id.split_once('?').map_or(id, |(path, _)| path);
        if path.is_empty() {
            return false;
        }
        let path = path.replace('\\', "/");
        self.include.is_match(&path) && !self.exclude.is_match(&path)
    }
}

fn build_glob_set(patterns: &[String]) -> ConfigResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smelt_config::ConfigError;
    use test_case::test_case;

    fn default_filter() -> PathFilter {
        PathFilter::from_config(&PipelineConfig::default()).unwrap()
    }

    #[test_case("/src/app.civet", true ; "absolute source")]
    #[test_case("app.civet", true ; "bare file name")]
    #[test_case("C:\\work\\src\\app.civet", true ; "windows separators")]
    #[test_case("/src/app.civet?import", true ; "query ignored")]
    #[test_case("/src/app.ts", false ; "other extension")]
    #[test_case("/src/app.civet.js", false ; "compiled artifact")]
    #[test_case("/proj/node_modules/lib/index.civet", false ; "dependency directory")]
    #[test_case("", false ; "empty identifier")]
    fn test_default_ownership(id: &str, owned: bool) {
        assert_eq!(default_filter().matches(id), owned);
    }

    #[test]
    fn test_custom_patterns() {
        let filter = PathFilter::new(
            &["src/**/*.civet".to_string()],
            &["src/generated/**".to_string()],
        )
        .unwrap();

        assert!(filter.matches("src/pages/index.civet"));
        assert!(!filter.matches("src/generated/schema.civet"));
        assert!(!filter.matches("lib/util.civet"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = PathFilter::new(&["src/[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
