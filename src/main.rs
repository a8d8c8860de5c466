mod cli;

#[tokio::main]
async fn main() {
    offline_shell::observability::init_tracing();

    let code = match cli::run() {
        cli::RunOutcome::Exit(code) => code,
        cli::RunOutcome::Serve(config) => match offline_shell::serve(config).await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, "front stopped");
                1
            }
        },
        cli::RunOutcome::SendPush(config, subscription, payload) => {
            match offline_shell::send_push(&config, &subscription, &payload).await {
                Ok(()) => {
                    println!("push sent to {}", subscription.endpoint);
                    0
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    1
                }
            }
        }
    };
    if code != 0 {
        std::process::exit(code);
    }
}
