use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parlance::{
    history::{ChatHistory, ChatMessage},
    plan::{render_text, spoken_script, Plan},
    stream::{client::ChatClient, reader::pump_reader, sse::SseEvent},
    tts::segmentation::split_into_sentences,
    utils::paths::{get_default_config_path, get_default_history_path},
    SpeechSink, SpeechToggle, StreamerConfig, TtsStreamer, Utterance,
};
use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Stand-in speech engine: prints each utterance as it would be spoken.
struct ConsoleSink {
    to_stderr: bool,
}

impl SpeechSink for ConsoleSink {
    fn speak(&mut self, utterance: Utterance) {
        let line = format!(
            "[speak lang={} rate={} pitch={}] {}",
            utterance.lang, utterance.rate, utterance.pitch, utterance.text
        );
        if self.to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn stop(&mut self) {
        tracing::debug!("speech stopped");
    }
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Replay a string as a stream of small deltas and speak it sentence by sentence
    #[command(alias = "t", long_flag_alias = "text", short_flag_alias = 't')]
    Text {
        /// Text to stream
        #[arg(
            default_value = "Good morning! Here is today's plan. Breakfast is overnight oats with berries and a spoon of peanut butter.
                Lunch is a lentil salad with feta. Dinner is baked salmon with roasted vegetables and rice. Enjoy"
        )]
        text: String,

        /// Characters per simulated network fragment
        #[arg(long = "delta-size", value_name = "CHARS", default_value_t = 7)]
        delta_size: usize,
    },

    /// Read raw text from stdin as it arrives and speak complete sentences
    #[command(aliases = ["stdio", "stdin", "-"], long_flag_aliases = ["stdio", "stdin"])]
    Pipe,

    /// Send a message to the chat server and speak the streamed reply
    #[command(alias = "c")]
    Chat {
        /// Message to send
        message: String,

        /// Base URL of the chat server
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        url: String,

        /// Chat history file
        #[arg(long, value_name = "HISTORY_PATH")]
        history: Option<PathBuf>,

        /// Print the reply without speaking it
        #[arg(long = "no-speak", default_value_t = false)]
        no_speak: bool,
    },

    /// Print a meal plan from a JSON file, optionally reading it aloud
    Plan {
        /// Path to the plan JSON
        input_path: PathBuf,

        /// Also speak a short summary of the plan
        #[arg(long, default_value_t = false)]
        speak: bool,
    },

    /// Show or clear the stored chat history
    History {
        /// Chat history file
        #[arg(long, value_name = "HISTORY_PATH")]
        history: Option<PathBuf>,

        /// Delete the stored history
        #[arg(long, default_value_t = false)]
        clear: bool,
    },

    /// Start a WebSocket server that chunks text for remote speech engines
    #[command(name = "websocket", alias = "ws", long_flag_aliases = ["ws", "websocket"])]
    WebSocket {
        /// IP address to bind to (typically 127.0.0.1 or 0.0.0.0)
        #[arg(long, default_value_t = [0, 0, 0, 0].into())]
        ip: IpAddr,

        /// Port to expose the WebSocket server on
        #[arg(long, default_value_t = 8766)]
        port: u16,
    },
}

#[derive(Parser, Debug)]
#[command(name = "parl")]
#[command(version = "0.1")]
#[command(author = "Lucas Jin")]
struct Cli {
    /// Streamer config file (JSON). Defaults to the per-user config if present
    #[arg(short = 'c', long = "config", value_name = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Shortest sentence, in characters, spoken on its own.
    /// Shorter sentences wait and are spoken together with the next one
    #[arg(short = 'm', long = "min-chunk", value_name = "CHARS")]
    min_chunk: Option<usize>,

    /// Speech language tag, e.g. en-US, en-GB, de-DE
    #[arg(short = 'l', long = "lang", value_name = "LANGUAGE")]
    lang: Option<String>,

    /// Rate of speech, as a coefficient of the default
    #[arg(short = 'p', long = "rate", value_name = "RATE")]
    rate: Option<f32>,

    /// Voice pitch, as a coefficient of the default
    #[arg(long = "pitch", value_name = "PITCH")]
    pitch: Option<f32>,

    /// Enable debug logs
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

impl Cli {
    fn streamer_config(&self) -> Result<StreamerConfig> {
        let mut config = match &self.config {
            Some(path) => StreamerConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                let path = get_default_config_path();
                if path.exists() {
                    StreamerConfig::from_file(&path)
                        .with_context(|| format!("failed to load config {}", path.display()))?
                } else {
                    StreamerConfig::default()
                }
            }
        };

        if let Some(min_chunk) = self.min_chunk {
            config.min_chunk_len = min_chunk;
        }
        if let Some(lang) = &self.lang {
            config.voice.lang = lang.clone();
        }
        if let Some(rate) = self.rate {
            config.voice.rate = rate;
        }
        if let Some(pitch) = self.pitch {
            config.voice.pitch = pitch;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Split text into fragments of `size` characters, like a network would.
fn simulated_deltas(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Feed the plan summary through the streamer one sentence at a time.
fn speak_plan<S: SpeechSink>(plan: &Plan, streamer: &mut TtsStreamer<S>) -> usize {
    let mut spoken = 0;
    for sentence in split_into_sentences(&spoken_script(plan)) {
        spoken += streamer.ingest(&format!("{sentence} "));
    }
    spoken + streamer.flush()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.streamer_config()?;
    tracing::debug!(?config, "streamer config");

    let toggle = SpeechToggle::new(true);

    ctrlc::set_handler(move || {
        eprintln!("Received termination signal, exiting immediately.");
        std::process::exit(0);
    })
    .context("failed to set Ctrl-C handler")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match cli.mode {
            Mode::Text { text, delta_size } => {
                let mut streamer =
                    TtsStreamer::new(&config, toggle, ConsoleSink { to_stderr: false });
                let mut spoken = 0;
                for delta in simulated_deltas(&text, delta_size) {
                    spoken += streamer.ingest(&delta);
                }
                spoken += streamer.flush();
                tracing::info!(spoken, "done");
            }

            Mode::Pipe => {
                let mut streamer =
                    TtsStreamer::new(&config, toggle, ConsoleSink { to_stderr: false });
                let mut stdin = tokio::io::stdin();
                let spoken = pump_reader(&mut stdin, &mut streamer)
                    .await
                    .context("failed to read stdin")?;
                tracing::info!(spoken, "input finished");
            }

            Mode::Chat {
                message,
                url,
                history,
                no_speak,
            } => {
                toggle.set(!no_speak);
                let mut streamer =
                    TtsStreamer::new(&config, toggle, ConsoleSink { to_stderr: true });
                let history =
                    ChatHistory::open(history.unwrap_or_else(get_default_history_path));

                // A fresh reply never continues an old one
                streamer.cancel();

                let message = message.trim();
                if message.is_empty() {
                    anyhow::bail!("message is empty");
                }
                history
                    .push(ChatMessage::user(message))
                    .context("failed to store message")?;
                let messages = history.conversation().context("failed to load history")?;

                let client = ChatClient::new(&url);
                let mut reply = String::new();
                let result = client
                    .stream_chat(&messages, |event| match event {
                        SseEvent::Delta(delta) => {
                            print!("{delta}");
                            let _ = std::io::stdout().flush();
                            reply.push_str(&delta);
                            streamer.ingest(&delta);
                        }
                        SseEvent::Error(message) => {
                            tracing::error!(%message, "server reported an error");
                        }
                        SseEvent::Done => tracing::debug!("reply complete"),
                    })
                    .await;

                streamer.flush();
                println!();
                result.with_context(|| format!("chat request to {} failed", client.endpoint()))?;

                if !reply.trim().is_empty() {
                    history
                        .push(ChatMessage::assistant(reply))
                        .context("failed to store reply")?;
                }
            }

            Mode::Plan { input_path, speak } => {
                let plan = Plan::from_file(&input_path)
                    .with_context(|| format!("failed to read plan {}", input_path.display()))?;
                print!("{}", render_text(&plan));
                if speak {
                    let mut streamer =
                        TtsStreamer::new(&config, toggle, ConsoleSink { to_stderr: true });
                    let spoken = speak_plan(&plan, &mut streamer);
                    tracing::debug!(spoken, "plan read aloud");
                }
            }

            Mode::History { history, clear } => {
                let history =
                    ChatHistory::open(history.unwrap_or_else(get_default_history_path));
                if clear {
                    history.clear().context("failed to clear history")?;
                    println!("Cleared {}", history.path().display());
                } else {
                    for item in history.load().context("failed to load history")? {
                        println!("{:?}: {}", item.role, item.content);
                    }
                }
            }

            Mode::WebSocket { ip, port } => {
                let addr = SocketAddr::from((ip, port));
                println!("Starting WebSocket server on {addr}");
                parlance_websocket::start_server(config, addr).await?;
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_deltas_respect_char_boundaries() {
        assert_eq!(simulated_deltas("héllo…!", 3), vec!["hél", "lo…", "!"]);
        assert_eq!(simulated_deltas("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "parl",
            "--config",
            "/nonexistent/parl.json",
            "text",
        ]);
        assert!(cli.streamer_config().is_err());

        let cli = Cli::parse_from(["parl", "-m", "12", "-l", "en-GB", "--rate", "1.2", "pipe"]);
        let dir_config = get_default_config_path();
        if !dir_config.exists() {
            let config = cli.streamer_config().unwrap();
            assert_eq!(config.min_chunk_len, 12);
            assert_eq!(config.voice.lang, "en-GB");
            assert_eq!(config.voice.rate, 1.2);
            assert_eq!(config.voice.pitch, 1.0);
        }
    }

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl SpeechSink for Collect {
        fn speak(&mut self, utterance: Utterance) {
            self.0.push(utterance.text);
        }
        fn stop(&mut self) {}
    }

    #[test]
    fn test_speak_plan_merges_short_sentences() {
        let plan: Plan = serde_json::from_str(
            r#"{"days": [{"label": "Monday", "totals": {"calories": 1900},
                "meals": [{"name": "Oats"}, {"name": "Lentil soup", "prep_time_min": 30}]}]}"#,
        )
        .unwrap();
        let config = StreamerConfig {
            min_chunk_len: 20,
            ..Default::default()
        };
        let mut streamer = TtsStreamer::new(&config, SpeechToggle::new(true), Collect::default());

        assert_eq!(speak_plan(&plan, &mut streamer), 2);
        assert_eq!(
            streamer.sink().0,
            vec![
                "Monday, about 1900 calories.",
                "Oats. Lentil soup, ready in 30 minutes."
            ]
        );
    }

    #[test]
    fn test_plan_subcommand_parses() {
        let cli = Cli::parse_from(["parl", "plan", "week.json", "--speak"]);
        match cli.mode {
            Mode::Plan { input_path, speak } => {
                assert_eq!(input_path, PathBuf::from("week.json"));
                assert!(speak);
            }
            other => panic!("unexpected mode: {other:?}"),
        }
    }

    #[test]
    fn test_zero_min_chunk_flag_is_rejected() {
        let cli = Cli::parse_from(["parl", "--min-chunk", "0", "pipe"]);
        assert!(cli.streamer_config().is_err());
    }
}
