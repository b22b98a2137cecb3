use shop_access::api;
use shop_access::logger::*;
use shop_access::server::*;
use shop_access::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("could not register SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(
        auth = %project_settings.auth.backend,
        session = %project_settings.session.backend,
        account = %project_settings.account.backend,
        api_key = %project_settings.api_key.backend,
        "settings loaded"
    );
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let http = &project_settings.http;
    let use_tls = !http.cert_path.is_empty() || !http.key_path.is_empty();
    if use_tls {
        if !fs::metadata(&http.cert_path)?.is_file() {
            return Err(anyhow::anyhow!(
                "TLS cert is not a regular file: {:?}",
                http.cert_path
            ));
        }
        if !fs::metadata(&http.key_path)?.is_file() {
            return Err(anyhow::anyhow!(
                "TLS key is not a regular file: {:?}",
                http.key_path
            ));
        }
    }

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    if use_tls {
        let (bound, serving) = warp::serve(api_v1)
            .tls()
            .cert_path(http.cert_path.clone())
            .key_path(http.key_path.clone())
            .bind_with_graceful_shutdown(address, shutdown_signal());
        info!(%bound, "listening (tls)");
        serving.await;
    } else {
        let (bound, serving) =
            warp::serve(api_v1).try_bind_with_graceful_shutdown(address, shutdown_signal())?;
        info!(%bound, "listening");
        serving.await;
    }

    let shutdown_timeout = std::time::Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
