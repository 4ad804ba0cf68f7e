use ibdpbwt::config::Config;
use ibdpbwt::error::Result;
use ibdpbwt::interner::Interner;
use ibdpbwt::pipeline;
use miette::IntoDiagnostic;

fn try_main() -> Result<()> {
    env_logger::init();
    let cfg = Config::from_argv()?;
    let raw_tokens: Vec<String> = std::env::args().skip(1).collect();
    let interner = Interner::new();
    pipeline::run(&cfg, &interner, &raw_tokens)
}

fn main() -> miette::Result<()> {
    try_main().into_diagnostic()
}
