//! Command-line interface definitions.
//!
//! Every option can be provided as a flag or through the environment (a `.env`
//! file in the working directory is loaded first).

use clap::Parser;

/// Command-line arguments for a single ingestion run.
///
/// # Examples
///
/// ```sh
/// # Everything from the environment / .env
/// current_affairs_ingest
///
/// # Look further back and slow down between articles
/// current_affairs_ingest --pages 5 --pacing-secs 4
///
/// # Override the category and phrase tables
/// current_affairs_ingest --tables ./tables.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing URL; page n>1 is fetched from `<base>page/<n>/`
    #[arg(long, env = "BASE_URL", default_value = "https://www.gktoday.in/current-affairs/")]
    pub base_url: String,

    /// Number of listing pages to scan
    #[arg(short, long, env = "PAGES", default_value_t = 3)]
    pub pages: u32,

    /// Seconds to wait between articles
    #[arg(long, env = "PACING_SECS", default_value_t = 2)]
    pub pacing_secs: u64,

    /// Translation target language code
    #[arg(long, env = "TARGET_LANG", default_value = "gu")]
    pub target_lang: String,

    /// Optional YAML file overriding phrase, category, and exclusion tables
    #[arg(short, long, env = "TABLES_PATH")]
    pub tables: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "news")]
    pub db_name: String,

    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[arg(long, env = "MONGO_DB", default_value = "news_scraper")]
    pub mongo_db: String,

    #[arg(long, env = "MONGO_COLLECTION", default_value = "scraped_urls")]
    pub mongo_collection: String,

    #[arg(long, env = "FTP_HOST", default_value = "localhost")]
    pub ftp_host: String,

    #[arg(long, env = "FTP_PORT", default_value_t = 21)]
    pub ftp_port: u16,

    #[arg(long, env = "FTP_USER", default_value = "anonymous")]
    pub ftp_user: String,

    #[arg(long, env = "FTP_PASSWORD", default_value = "", hide_env_values = true)]
    pub ftp_password: String,

    #[arg(long, env = "FTP_UPLOAD_PATH", default_value = "/")]
    pub ftp_upload_path: String,

    /// Public URL prefix under which uploaded images are served
    #[arg(long, env = "IMAGE_BASE_URL", default_value = "https://newsadmin.currentadda.com/upload")]
    pub image_base_url: String,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHANNEL")]
    pub telegram_channel: Option<String>,

    /// Firebase service account JSON (inline)
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT", hide_env_values = true)]
    pub firebase_service_account: Option<String>,

    /// Firebase service account JSON file
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT_PATH")]
    pub firebase_service_account_path: Option<String>,

    #[arg(long, env = "FCM_NOTIFICATION_TOPIC", default_value = "android_news_app_topic")]
    pub fcm_topic: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "current_affairs_ingest",
            "--pages",
            "5",
            "--pacing-secs",
            "0",
            "--base-url",
            "http://localhost:8080/listing/",
        ]);

        assert_eq!(cli.pages, 5);
        assert_eq!(cli.pacing_secs, 0);
        assert_eq!(cli.base_url, "http://localhost:8080/listing/");
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["current_affairs_ingest", "-p", "1", "-t", "/tmp/tables.yaml"]);

        assert_eq!(cli.pages, 1);
        assert_eq!(cli.tables.as_deref(), Some("/tmp/tables.yaml"));
    }
}
