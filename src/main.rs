use anyhow::Context;
use argh::FromArgs;
use log::info;
use spys::{Endpoint, Shell, ShellConfig};

#[derive(FromArgs)]
/// Interactive command shell with loadable command bundles.
struct Args {
    /// prompt to show instead of the configured one
    #[argh(option, short = 'p')]
    prompt: Option<String>,

    /// plugin to load before the first prompt; may be repeated
    #[argh(option, short = 'l')]
    load: Vec<String>,

    /// script to run before the first prompt
    #[argh(option, short = 's')]
    script: Option<String>,

    /// read plain lines from stdin, without line editing
    #[argh(switch)]
    plain: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Args = argh::from_env();

    let mut config = ShellConfig::from_env();
    if let Some(prompt) = args.prompt {
        config = config.with_prompt(prompt);
    }

    let mut shell = Shell::with_config(config, None);
    if !args.plain {
        let reader = spys::readline::endpoint(shell.io().candidates())
            .context("failed to set up line editor")?;
        shell.io().register_input(Endpoint::DEFAULT, Some(reader));
    }

    for name in &args.load {
        let message = spys::plugin::load(&mut shell, name);
        shell.output(&message, Endpoint::DEFAULT)?;
    }

    if let Some(path) = &args.script {
        info!("running script {path}");
        if let Some(message) = shell.run_script(path)? {
            shell.output(&message, Endpoint::DEFAULT)?;
        }
    }

    shell.start();
    Ok(())
}
