use sea_orm::Database;
use tracing::info;

use oasis_core::tracing::init_tracing;
use oasis_tickets::config::TicketsConfig;
use oasis_tickets::infra::gateway::MercadoPagoGateway;
use oasis_tickets::infra::mailer::SmtpMailer;
use oasis_tickets::infra::pdf::PdfTicketRenderer;
use oasis_tickets::infra::storage::S3FileStorage;
use oasis_tickets::router::build_router;
use oasis_tickets::state::AppState;
use oasis_tickets::worker::ReceiptWorker;

#[tokio::main]
async fn main() {
    init_tracing("info,sqlx=warn,aws_config=warn");

    let config = TicketsConfig::from_env();
    info!(?config, "tickets service starting");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let aws = aws_config::load_from_env().await;
    let storage = S3FileStorage {
        client: aws_sdk_s3::Client::new(&aws),
        bucket: config.s3_bucket.clone(),
        public_base_url: config.s3_public_base_url.clone(),
        timeout: config.upstream_timeout,
    };

    let gateway =
        MercadoPagoGateway::new(config.gateway_settings()).expect("invalid gateway configuration");
    let mailer = SmtpMailer::new(config.smtp_settings()).expect("invalid SMTP configuration");

    let state = AppState {
        db,
        gateway,
        storage,
        mailer,
        renderer: PdfTicketRenderer {
            venue: config.venue_name.clone(),
        },
        tickets_prefix: config.s3_tickets_prefix.clone(),
        orders_prefix: config.s3_orders_prefix.clone(),
    };

    // Receipt delivery runs off the request path.
    let worker = ReceiptWorker {
        state: state.clone(),
        poll_interval: config.outbox_poll_interval,
    };
    tokio::spawn(worker.run());

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.tickets_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("tickets service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
