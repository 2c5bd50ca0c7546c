#[cfg(not(feature = "streaming"))]
fn main() {
    eprintln!(
        "The sankofa-audio CLI requires the \"streaming\" feature. Rebuild with `--features streaming` to enable playback."
    );
}

#[cfg(feature = "streaming")]
mod cli {
    use std::io::{self, BufRead, Write};
    use std::path::PathBuf;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::thread;
    use std::time::{Duration, Instant};

    use anyhow::Context as _;
    use sankofa_audio::{
        BackgroundMusic, ContextState, Cue, RodioBackend, SoundContext, SoundCues, SoundManifest,
    };
    use tracing::info;
    use tracing_subscriber::{fmt, EnvFilter};

    const TICK: Duration = Duration::from_millis(50);

    /// Parsed command-line arguments.
    #[derive(Debug, Default, PartialEq)]
    pub struct CliArgs {
        /// JSON manifest path
        pub manifest: Option<PathBuf>,
        /// Clip shared by every cue, overrides the manifest sources
        pub sound: Option<PathBuf>,
        /// Autoplay delay override
        pub delay_ms: Option<u64>,
        /// Start muted
        pub muted: bool,
        /// Run the background music player alongside the cues
        pub music: bool,
        /// Whether help was requested
        pub show_help: bool,
    }

    impl CliArgs {
        /// Parse arguments, program name already skipped.
        pub fn parse_from(iter: impl IntoIterator<Item = String>) -> Self {
            let mut args = Self::default();
            let mut iter = iter.into_iter();

            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--help" | "-h" => args.show_help = true,
                    "--muted" => args.muted = true,
                    "--music" => args.music = true,
                    "--manifest" => match iter.next() {
                        Some(value) => args.manifest = Some(PathBuf::from(value)),
                        None => {
                            eprintln!("--manifest requires a file argument");
                            args.show_help = true;
                        }
                    },
                    "--sound" => match iter.next() {
                        Some(value) => args.sound = Some(PathBuf::from(value)),
                        None => {
                            eprintln!("--sound requires a file argument");
                            args.show_help = true;
                        }
                    },
                    "--delay-ms" => match iter.next().map(|v| v.parse::<u64>()) {
                        Some(Ok(ms)) => args.delay_ms = Some(ms),
                        _ => {
                            eprintln!("--delay-ms requires a number of milliseconds");
                            args.show_help = true;
                        }
                    },
                    _ => {
                        eprintln!("Unknown argument: {}", arg);
                        args.show_help = true;
                    }
                }
            }

            args
        }

        /// Print help text to stderr.
        pub fn print_help() {
            eprintln!(
                "Usage:\n  sankofa-audio [--manifest <file.json>] [--sound <clip>] [--delay-ms <n>] [--muted] [--music]\n\n\
                 Flags:\n\
                 \x20 --manifest <file>    Cue presets (JSON); defaults to the stock presets\n\
                 \x20 --sound <clip>       Use one clip for every cue\n\
                 \x20 --delay-ms <n>       Ambient autoplay delay (default 2000)\n\
                 \x20 --muted              Start muted\n\
                 \x20 --music              Play the looping background music\n\
                 \x20 -h, --help           Show this help\n\n\
                 Commands (stdin):\n\
                 \x20 click | hover | success | ambient   Play a cue\n\
                 \x20 stop                                Stop the ambient loop\n\
                 \x20 mute                                Toggle mute\n\
                 \x20 music                               Toggle background music\n\
                 \x20 status                              Show state\n\
                 \x20 quit                                Exit\n"
            );
        }
    }

    fn init_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,sankofa_audio=debug"));
        fmt().with_env_filter(filter).with_writer(io::stderr).init();
    }

    fn build_manifest(args: &CliArgs) -> anyhow::Result<SoundManifest> {
        let mut manifest = match &args.manifest {
            Some(path) => SoundManifest::load(path)
                .with_context(|| format!("loading manifest {}", path.display()))?,
            None => SoundManifest::default(),
        };
        if let Some(sound) = &args.sound {
            manifest = manifest.with_shared_source(sound);
        }
        if let Some(ms) = args.delay_ms {
            manifest = manifest.with_autoplay_delay(Duration::from_millis(ms));
        }
        Ok(manifest)
    }

    fn print_status(context: &SoundContext, music: Option<&BackgroundMusic>) {
        let state = match context.state() {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Loading => "loading",
            ContextState::Ready => "ready",
            ContextState::AmbientPlaying => "ambient playing",
            ContextState::AmbientStopped => "ambient stopped",
            ContextState::TornDown => "torn down",
        };
        println!(
            "state: {}, muted: {}, cues loaded: {}",
            state,
            context.is_muted(),
            context.registry().len()
        );
        for key in context.registry().keys() {
            if let Some(handle) = context.registry().get(key) {
                println!(
                    "  {:<8} vol {:.2} loop {:<5} {:?} at {:.2}s",
                    key,
                    handle.volume(),
                    handle.is_looping(),
                    handle.state(),
                    handle.position().as_secs_f32()
                );
            }
        }
        if let Some(music) = music {
            println!(
                "  music    muted {:<5} {:?} at {:.2}s",
                music.is_muted(),
                music.state(),
                music.position().as_secs_f32()
            );
        }
    }

    pub fn run() -> anyhow::Result<()> {
        let args = CliArgs::parse_from(std::env::args().skip(1));
        if args.show_help {
            CliArgs::print_help();
            return Ok(());
        }
        init_tracing();

        let manifest = build_manifest(&args)?;
        let mut music = if args.music {
            let backend = RodioBackend::new().context("opening audio output for music")?;
            let mut music = BackgroundMusic::from_manifest(Box::new(backend), &manifest);
            music.init();
            Some(music)
        } else {
            None
        };
        let backend = RodioBackend::new().context("opening audio output")?;
        let shared = SoundContext::new(Box::new(backend), manifest).into_shared();
        let cues = SoundCues::new(&shared);

        shared.borrow_mut().init(Instant::now());
        if args.muted {
            shared.borrow_mut().set_muted(true);
        }

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        print!("> ");
        io::stdout().flush().ok();
        loop {
            shared.borrow_mut().update(Instant::now());

            let line = match rx.recv_timeout(TICK) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            match line.trim() {
                "" => {}
                "quit" | "exit" | "q" => break,
                "stop" => cues.stop_ambient_sound(),
                "mute" => {
                    let muted = cues.toggle_mute();
                    println!("{}", if muted { "muted" } else { "unmuted" });
                }
                "music" => match music.as_mut() {
                    Some(music) => {
                        let muted = music.toggle_mute();
                        println!("music {}", if muted { "muted" } else { "playing" });
                    }
                    None => println!("background music is off (start with --music)"),
                },
                "status" => print_status(&shared.borrow(), music.as_ref()),
                "help" => CliArgs::print_help(),
                other => match Cue::from_key(other) {
                    Some(cue) => cues.play(cue),
                    None => println!("unknown command: {} (try 'help')", other),
                },
            }
            print!("> ");
            io::stdout().flush().ok();
        }

        shared.borrow_mut().teardown();
        if let Some(music) = music.as_mut() {
            music.teardown();
        }
        info!("bye");
        Ok(())
    }

}

#[cfg(feature = "streaming")]
fn main() -> anyhow::Result<()> {
    cli::run()
}
