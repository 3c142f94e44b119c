use std::process::ExitCode;

use request_response_logger::{
    logging,
    server::{self, Server},
    settings::Settings,
};
use tracing::instrument::WithSubscriber;
use tracing::{error, info, warn};

async fn run(settings: Settings) -> server::Result<()> {
    for warning in &settings.diagnostics {
        warn!("{}", warning);
    }

    info!("Starting web host");
    let server = Server::bind(&settings).await?;
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "종료 신호 대기 실패");
            }
        })
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_handle = match logging::init(&settings.logging) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("로깅 초기화 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let dispatch = log_handle.dispatch().clone();
    let exit_code = match run(settings).with_subscriber(dispatch.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::dispatcher::with_default(&dispatch, || {
                error!(fatal = true, error = %e, "Host terminated unexpectedly");
            });
            ExitCode::FAILURE
        }
    };

    drop(dispatch);
    log_handle.flush_and_close();
    exit_code
}
