use channel_feed::logging;

enum Mode {
    Interactive,
    RenderList,
    RenderChannel(String),
}

fn main() {
    let mode = match parse_args() {
        Ok(Some(mode)) => mode,
        Ok(None) => return,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let result = match mode {
        Mode::Interactive => {
            logging::init(logging::Target::FileOnly);
            channel_feed::run()
        }
        Mode::RenderList => {
            logging::init(logging::Target::Stderr);
            channel_feed::render_list().map(|html| println!("{html}"))
        }
        Mode::RenderChannel(id) => {
            logging::init(logging::Target::Stderr);
            channel_feed::render_channel(&id).map(|html| println!("{html}"))
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Option<Mode>, String> {
    let mut mode = Mode::Interactive;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Channel Feed {}", channel_feed::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!(
                    "Channel Feed - Browse curated YouTube channels from the terminal.\n\n  --render                  Print the channel list as HTML and exit\n  --render-channel <ID>     Print one channel's detail view as HTML and exit\n  --version, -V             Show version and exit\n  --help,    -h             Show this help message"
                );
                return Ok(None);
            }
            "--render" => mode = Mode::RenderList,
            "--render-channel" => match args.next() {
                Some(id) if !id.trim().is_empty() => mode = Mode::RenderChannel(id),
                _ => return Err("--render-channel requires a channel id".to_string()),
            },
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(mode))
}
