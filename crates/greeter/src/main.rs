use anyhow::Context;
use tracing_subscriber::EnvFilter;

use endpoints::Invocation;
use endpoints::Server;
use greeter::Settings;
use greeter::proto;
use greeter::proto::Greeter;
use greeter::proto::GreeterService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env();
    let server = Server::new();
    let container = greeter::container(&settings);

    let endpoints = greeter::serve(container.clone(), &server).context("failed to start greeter")?;
    let greeter = endpoints
        .dispatcher::<Greeter>()
        .context("greeter contract was not bound")?;

    let mut names: Vec<String> = std::env::args().skip(1).collect();
    if names.is_empty() {
        names = vec!["Ada".into(), "Grace".into()];
    }

    for name in &names {
        let reply = greeter.say_hello(proto::hello(name.as_str())).await?;
        println!("{}", reply.message);
    }

    // same contract, reached the way a remote client would through the host
    for name in names {
        let reply: proto::GoodbyeReply = server
            .call_typed("greet.Greeter", "SayGoodbye", Invocation::new(proto::GoodbyeRequest { name }))
            .await?;
        println!("{}", reply.message);
    }

    let stats = container.stats();
    tracing::info!(opened = stats.opened, closed = stats.closed, "done");
    Ok(())
}
