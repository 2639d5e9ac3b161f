use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDB,
    Memory,
}

/// Runtime configuration, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "default-secret-change-me".to_string(),
            issuer: "assignmate-service".to_string(),
            audience: "assignmate-app".to_string(),
            ttl_hours: 24,
        }
    }
}

/// One hour up to one year.
const TOKEN_TTL_RANGE: std::ops::RangeInclusive<i64> = 1..=8760;

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = JwtConfig::default();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3002".to_string())
            .parse::<u16>()
            .map_err(|e| format!("PORT must be a valid port number: {}", e))?;

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" | "mongo" => StorageBackend::MongoDB,
            "memory" => StorageBackend::Memory,
            other => return Err(format!("Unknown STORAGE_BACKEND: {}. Supported: mongodb, memory", other)),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::MongoDB && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORAGE_BACKEND=mongodb".to_string());
        }

        let ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(v) => parse_ttl_hours(&v)?,
            Err(_) => defaults.ttl_hours,
        };

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(v) => v
                .parse::<u32>()
                .map_err(|e| format!("BCRYPT_COST must be an integer: {}", e))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            storage,
            database_url,
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or(defaults.secret),
                issuer: env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
                audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
                ttl_hours,
            },
            bcrypt_cost,
            cors_origins,
        })
    }
}

fn parse_ttl_hours(raw: &str) -> Result<i64, String> {
    let hours = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("TOKEN_TTL_HOURS must be an integer: {}", e))?;
    if !TOKEN_TTL_RANGE.contains(&hours) {
        return Err(format!(
            "TOKEN_TTL_HOURS must be between {} and {}, got {}",
            TOKEN_TTL_RANGE.start(),
            TOKEN_TTL_RANGE.end(),
            hours
        ));
    }
    Ok(hours)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_origins() {
        let origins = parse_origins(" http://a.test ,,http://b.test ");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn token_ttl_must_be_within_a_year() {
        assert_eq!(parse_ttl_hours("24"), Ok(24));
        assert_eq!(parse_ttl_hours("1"), Ok(1));
        assert_eq!(parse_ttl_hours("8760"), Ok(8760));

        for raw in ["0", "-1", "8761", "9000"] {
            let err = parse_ttl_hours(raw).unwrap_err();
            assert!(err.contains("between 1 and 8760"), "{}: {}", raw, err);
        }
        assert!(parse_ttl_hours("abc").unwrap_err().contains("must be an integer"));
    }
}
