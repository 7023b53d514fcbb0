//! mediashell - headless driver for the player shell.
//!
//! `simulate` builds a player on a headless document, drives a fake backend
//! for a while and logs every player event. `schema` prints the JSON schema
//! of the configuration file.

use std::{error::Error, path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use mediashell::{
    config::Config,
    dom::{Document, Element, MediaElement},
    player::{EventKind, OptionOverrides, Player, PlayerKind},
    providers::{
        ProviderRegistry, html5,
        vimeo::{self, Inbound, Outbound},
    },
    shell::{Shell, ShellOptions},
    tracing_config,
};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, debug, info, span, warn};

const VIMEO_DEMO_ID: &str = "76979871";

#[derive(Parser)]
#[command(name = "mediashell")]
#[command(about = "Headless media player shell")]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Html5,
    Vimeo,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Audio,
    Video,
}

impl From<KindArg> for PlayerKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Audio => PlayerKind::Audio,
            KindArg::Video => PlayerKind::Video,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless playback session and log player events
    Simulate {
        #[arg(short, long, value_enum, default_value = "html5")]
        provider: ProviderArg,

        #[arg(short, long, value_enum, default_value = "video")]
        kind: KindArg,

        /// Media length in seconds
        #[arg(short, long, default_value_t = 12.0)]
        duration: f64,

        /// Simulated seconds to run
        #[arg(short, long, default_value_t = 8)]
        seconds: u64,

        /// Milliseconds of wall time per simulated second
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,

        /// Restart from zero at the end
        #[arg(long = "loop")]
        loop_playback: bool,
    },
    /// Print the configuration JSON schema
    Schema,
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_or_default(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Schema => println!("{}", Config::json_schema()?),
        Commands::Config => print!("{}", config.to_toml_string()?),
        Commands::Simulate {
            provider,
            kind,
            duration,
            seconds,
            tick_ms,
            loop_playback,
        } => {
            tracing_config::init(config.general.log_level, config.general.log_format)?;
            let _span = span!(Level::INFO, "simulate").entered();

            let session = Session {
                kind: kind.into(),
                duration,
                seconds,
                tick: Duration::from_millis(tick_ms),
                loop_playback,
            };
            match provider {
                ProviderArg::Html5 => session.run_html5(&config).await?,
                ProviderArg::Vimeo => session.run_vimeo(&config).await?,
            }
        }
    }

    Ok(())
}

struct Session {
    kind: PlayerKind,
    duration: f64,
    seconds: u64,
    tick: Duration,
    loop_playback: bool,
}

impl Session {
    fn shell_options(&self, provider: &str) -> ShellOptions {
        ShellOptions {
            provider: provider.to_string(),
            kind: Some(self.kind),
            overrides: OptionOverrides {
                autoplay: Some(true),
                loop_playback: Some(self.loop_playback),
                ..OptionOverrides::default()
            },
        }
    }

    async fn run_html5(&self, config: &Config) -> Result<(), Box<dyn Error>> {
        let document = Document::new();
        let target = Element::new(self.kind.as_str()).with_attribute("id", "media");
        document.body().append_child(&target);
        let media = MediaElement::new(target).ok_or("media element expected")?;

        let shell = Shell::new(
            &document,
            "#media",
            self.shell_options(html5::NAME),
            &ProviderRegistry::with_defaults(),
            config,
        )?;
        log_events(shell.player());

        media.load_metadata(self.duration);
        shell.player().wait_until_ready().await;
        document.focus(shell.player().container());

        let mut interval = tokio::time::interval(self.tick);
        interval.tick().await;
        for second in 1..=self.seconds {
            interval.tick().await;
            media.advance(1.0);
            self.press_demo_key(&document, second);
            tokio::task::yield_now().await;
        }

        shell.destroy();
        info!("session finished");
        Ok(())
    }

    async fn run_vimeo(&self, config: &Config) -> Result<(), Box<dyn Error>> {
        if self.kind == PlayerKind::Audio {
            warn!("vimeo embeds are video only, simulating a video player");
        }

        let document = Document::new();
        document.body().append_child(
            &Element::new("div")
                .with_attribute("id", "media")
                .with_attribute(vimeo::ID_ATTRIBUTE, VIMEO_DEMO_ID),
        );

        let mut options = self.shell_options(vimeo::NAME);
        options.kind = Some(PlayerKind::Video);

        let embed = FakeEmbed {
            document: document.clone(),
            origin: config.providers.vimeo.origin.clone(),
            duration: self.duration,
            time: 0.0,
            volume: 1.0,
            playing: false,
        };
        let posted = document.subscribe_posted();

        let shell = Shell::new(
            &document,
            "#media",
            options,
            &ProviderRegistry::with_defaults(),
            config,
        )?;
        log_events(shell.player());

        let ticks = self.seconds;
        let tick = self.tick;
        let looped = self.loop_playback;
        let embed_task = tokio::spawn(embed.run(posted, ticks, tick, looped));

        shell.player().wait_until_ready().await;
        document.focus(shell.player().container());

        embed_task.await?;
        shell.destroy();
        info!("session finished");
        Ok(())
    }

    fn press_demo_key(&self, document: &Document, second: u64) {
        let key = match second {
            2 => "ArrowUp",
            3 => "ArrowDown",
            4 => "ArrowRight",
            _ => return,
        };
        debug!(key, "pressing key");
        document.key_down(key);
    }
}

fn log_events(player: &Player) {
    for kind in EventKind::ALL {
        player.on(kind, move |event| {
            let state = event.player.state().snapshot();
            info!(
                event = %event.kind,
                paused = ?state.paused,
                muted = state.muted,
                fullscreen = state.fullscreen,
                loading = state.loading,
                "player event"
            );
        });
    }
}

/// Stand-in for the remote player answering the postMessage protocol.
struct FakeEmbed {
    document: Document,
    origin: String,
    duration: f64,
    time: f64,
    volume: f64,
    playing: bool,
}

impl FakeEmbed {
    async fn run(
        mut self,
        mut posted: tokio::sync::broadcast::Receiver<mediashell::dom::PostedMessage>,
        ticks: u64,
        tick: Duration,
        looped: bool,
    ) {
        self.emit(&Inbound::Event {
            event: "ready".into(),
            data: None,
        });

        let mut interval = tokio::time::interval(tick);
        interval.tick().await;
        let mut remaining = ticks;

        while remaining > 0 {
            tokio::select! {
                message = posted.recv() => match message {
                    Ok(message) => self.answer(&message.data),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "embed fell behind"),
                    Err(RecvError::Closed) => break,
                },
                _ = interval.tick() => {
                    remaining -= 1;
                    self.advance(looped);
                }
            }
        }
    }

    fn answer(&mut self, data: &str) {
        let Ok(message) = serde_json::from_str::<Outbound>(data) else {
            warn!(data, "embed received malformed message");
            return;
        };
        let number = message.value.as_ref().and_then(serde_json::Value::as_f64);

        let reply = match message.method.as_str() {
            "play" => {
                self.playing = true;
                None
            }
            "pause" => {
                self.playing = false;
                None
            }
            "setCurrentTime" => {
                self.time = number.unwrap_or(self.time).clamp(0.0, self.duration);
                None
            }
            "setVolume" => {
                self.volume = number.unwrap_or(self.volume);
                None
            }
            "getCurrentTime" => Some(self.time),
            "getDuration" => Some(self.duration),
            "getVolume" => Some(self.volume),
            _ => None,
        };

        if let Some(value) = reply {
            self.emit(&Inbound::Reply {
                method: message.method,
                value: Some(json!(value)),
            });
        }
    }

    fn advance(&mut self, looped: bool) {
        if !self.playing {
            return;
        }

        self.time += 1.0;
        if self.time < self.duration {
            self.emit(&Inbound::Event {
                event: "timeupdate".into(),
                data: Some(json!({ "seconds": self.time })),
            });
            return;
        }

        if looped {
            self.time = 0.0;
        } else {
            self.time = self.duration;
            self.playing = false;
        }
        self.emit(&Inbound::Event {
            event: "ended".into(),
            data: None,
        });
    }

    fn emit(&self, message: &Inbound) {
        match serde_json::to_string(message) {
            Ok(data) => self.document.receive_message(&self.origin, &data),
            Err(error) => warn!(%error, "cannot encode embed reply"),
        }
    }
}
