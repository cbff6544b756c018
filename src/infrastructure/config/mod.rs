use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    // Synthesis provider credentials, ordered; rotation walks this list
    pub gemini_api_keys: Vec<String>,
    // Object storage
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage_bucket: String,
    // Word catalog selection
    pub wordlist_path: String,
    pub target_level: String,
    pub group_start: u32,
    pub group_end: u32,
    pub environment: Environment,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            // A missing key list must not prevent startup; synthesis then
            // fails per word through the normal fallback path.
            gemini_api_keys: env::var("GEMINI_API_KEYS")
                .map(|raw| parse_key_list(&raw))
                .unwrap_or_default(),
            supabase_url: env::var("SUPABASE_URL")?,
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")?,
            storage_bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "audios".to_string()),
            wordlist_path: env::var("WORDLIST_PATH").unwrap_or_else(|_| "words.json".to_string()),
            target_level: env::var("TARGET_LEVEL").unwrap_or_else(|_| "A1".to_string()),
            group_start: env::var("GROUP_START")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            group_end: env::var("GROUP_END")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

/// Parse a comma-delimited credential list, dropping empty entries.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_key_list_splits_and_trims() {
        let keys = parse_key_list("key-a, key-b ,key-c");
        assert_eq!(keys, vec!["key-a", "key-b", "key-c"]);
    }

    #[test]
    fn test_parse_key_list_drops_empty_entries() {
        let keys = parse_key_list("key-a,,key-b,");
        assert_eq!(keys, vec!["key-a", "key-b"]);
    }

    #[test]
    fn test_parse_key_list_empty_input() {
        assert_eq!(parse_key_list(""), Vec::<String>::new());
        assert_eq!(parse_key_list("  ,  "), Vec::<String>::new());
    }
}
