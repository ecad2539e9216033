use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// SMTP transport settings for transactional mail.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "warung".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "warung-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let mail = MailConfig {
            host: std::env::var("MAIL_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("MAIL_USERNAME").unwrap_or_default(),
            password: std::env::var("MAIL_PASSWORD").unwrap_or_default(),
            from_name: std::env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "Warung".into()),
            from_address: std::env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "no-reply@warung.local".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
        })
    }
}
