use anyhow::Result;
use clap::Parser;

use dataroom::LogTarget;
use dataroom::app::preview::TempFilePreviews;
use dataroom::infra::config::Config;
use dataroom::ui::app::UiApp;
use dataroom::ui::cli::{self, Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(dir) = &cli.storage_dir {
        config.storage.set_dir(dir.display().to_string());
    }

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => {
            dataroom::init(LogTarget::File(config.storage.dir().join("dataroom.log")))?;
            let previews = TempFilePreviews::new()?;
            let session = dataroom::ui::open_session(&config, previews);
            UiApp::new(session).run()
        }
        command => {
            dataroom::init(LogTarget::Stderr)?;
            cli::run(command, &config)
        }
    }
}
