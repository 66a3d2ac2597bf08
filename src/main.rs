use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bill_intake::auth::{AdminAuth, SupabaseAuth};
use bill_intake::config::Config;
use bill_intake::db::Database;
use bill_intake::db_storage::{RecordStore, SubmissionStorage};
use bill_intake::extraction::PdfTextExtractor;
use bill_intake::handlers::AppState;
use bill_intake::notifier::{Notifier, SmtpNotifier};
use bill_intake::progress::ProgressStore;
use bill_intake::routes;
use bill_intake::storage::{BlobStore, SupabaseStorage};

/// Main entry point for the application.
///
/// Initializes logging, configuration and whichever collaborators are
/// configured (database, blob storage, admin auth, mail), then serves the
/// router. Missing collaborators are logged; their routes answer 500.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bill_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let records: Option<Arc<dyn RecordStore>> = match config.database_url {
        Some(ref url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            let storage: Arc<dyn RecordStore> = Arc::new(SubmissionStorage::new(db.pool));
            Some(storage)
        }
        None => None,
    };

    // Supabase storage and auth share one configuration section
    let (blobs, auth): (Option<Arc<dyn BlobStore>>, Option<Arc<dyn AdminAuth>>) =
        match config.supabase {
            Some(ref supabase) => {
                let storage: Arc<dyn BlobStore> = Arc::new(SupabaseStorage::new(supabase)?);
                let auth: Arc<dyn AdminAuth> = Arc::new(SupabaseAuth::new(supabase)?);
                tracing::info!("✓ Supabase clients initialized: {}", supabase.url);
                (Some(storage), Some(auth))
            }
            None => (None, None),
        };

    let notifier: Option<Arc<dyn Notifier>> = match config.smtp {
        Some(ref smtp) => match SmtpNotifier::new(smtp) {
            Ok(notifier) => {
                tracing::info!("✓ SMTP notifier initialized: {}:{}", smtp.host, smtp.port);
                let notifier: Arc<dyn Notifier> = Arc::new(notifier);
                Some(notifier)
            }
            Err(e) => {
                tracing::error!("Failed to initialize SMTP notifier: {}", e);
                None
            }
        },
        None => None,
    };

    // Build application state
    let app_state = Arc::new(AppState {
        blobs,
        records,
        notifier,
        auth,
        text_extractor: Arc::new(PdfTextExtractor),
        progress: ProgressStore::default(),
    });
    tracing::info!("Analysis progress cache initialized");

    let app = routes::build_router(app_state, true)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
