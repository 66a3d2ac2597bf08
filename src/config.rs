use serde::Deserialize;

/// Default bucket holding uploaded bills.
pub const DEFAULT_BUCKET: &str = "pdfs";

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string for the `submissions` table.
    pub database_url: Option<String>,
    /// Hosted storage/auth backend. Missing means blob and admin routes answer 500.
    pub supabase: Option<SupabaseConfig>,
    /// Outbound mail settings. Missing means submissions are rejected with 500.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub admin_email: String,
    /// Overrides the sender address, otherwise `user` is used.
    pub from: Option<String>,
    /// Implicit TLS when true, STARTTLS otherwise.
    pub secure: bool,
}

impl SmtpConfig {
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.user)
    }
}

fn non_empty_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: non_empty_var(&["DATABASE_URL", "DB_URL"])
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            supabase: Self::supabase_from_env()?,
            smtp: Self::smtp_from_env()?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match config.database_url {
            Some(ref url) => tracing::debug!("Database URL: {}...", &url[..20.min(url.len())]),
            None => tracing::warn!("DATABASE_URL not set, submission and admin routes will fail"),
        }
        match config.supabase {
            Some(ref supabase) => tracing::debug!(
                "Supabase URL: {} (bucket: {})",
                supabase.url,
                supabase.bucket
            ),
            None => tracing::warn!("Supabase not configured, storage and admin routes will fail"),
        }
        match config.smtp {
            Some(ref smtp) => tracing::debug!("SMTP relay: {}:{}", smtp.host, smtp.port),
            None => tracing::warn!("SMTP not configured, submit route will fail"),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    fn supabase_from_env() -> anyhow::Result<Option<SupabaseConfig>> {
        let url = non_empty_var(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]);
        let service_key = non_empty_var(&["SUPABASE_SERVICE_ROLE_KEY"]);

        let (Some(url), Some(service_key)) = (url, service_key) else {
            return Ok(None);
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("SUPABASE_URL must start with http:// or https://");
        }

        Ok(Some(SupabaseConfig {
            url: url.trim_end_matches('/').to_string(),
            service_key,
            bucket: non_empty_var(&["STORAGE_BUCKET"]).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        }))
    }

    fn smtp_from_env() -> anyhow::Result<Option<SmtpConfig>> {
        let host = non_empty_var(&["SMTP_HOST"]);
        let user = non_empty_var(&["SMTP_USER"]);
        let password = non_empty_var(&["SMTP_PASS"]);
        let admin_email = non_empty_var(&["ADMIN_EMAIL"]);

        let (Some(host), Some(user), Some(password), Some(admin_email)) =
            (host, user, password, admin_email)
        else {
            return Ok(None);
        };

        let port = match non_empty_var(&["SMTP_PORT"]) {
            Some(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a valid number between 1-65535"))?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(Some(SmtpConfig {
            host,
            port,
            user,
            password,
            admin_email,
            from: non_empty_var(&["SMTP_FROM"]),
            secure: std::env::var("SMTP_SECURE").map(|v| v == "true").unwrap_or(false),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(from: Option<&str>) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: DEFAULT_SMTP_PORT,
            user: "mailer@example.com".to_string(),
            password: "secret".to_string(),
            admin_email: "admin@example.com".to_string(),
            from: from.map(str::to_string),
            secure: false,
        }
    }

    #[test]
    fn test_sender_defaults_to_smtp_user() {
        assert_eq!(smtp(None).sender(), "mailer@example.com");
    }

    #[test]
    fn test_sender_override() {
        assert_eq!(
            smtp(Some("bills@example.com")).sender(),
            "bills@example.com"
        );
    }

    #[test]
    fn test_blank_variable_falls_through_to_alias() {
        std::env::set_var("BILL_INTAKE_TEST_PRIMARY_URL", "  ");
        std::env::set_var("BILL_INTAKE_TEST_ALIAS_URL", "postgres://db/bills");
        assert_eq!(
            non_empty_var(&["BILL_INTAKE_TEST_PRIMARY_URL", "BILL_INTAKE_TEST_ALIAS_URL"]).as_deref(),
            Some("postgres://db/bills")
        );

        std::env::set_var("BILL_INTAKE_TEST_ALIAS_URL", "");
        assert_eq!(
            non_empty_var(&["BILL_INTAKE_TEST_PRIMARY_URL", "BILL_INTAKE_TEST_ALIAS_URL"]),
            None
        );
    }
}
