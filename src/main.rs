use log::{debug, error};
use rotten_recipe::{AppConfig, RecipeExtractor};
use std::env;

const USAGE: &str = "Usage:
  rotten-recipe extract <url> <uid>    Extract a recipe post and save it for a user
  rotten-recipe ingredients <text>     Extract ingredients from text only";

enum Command {
    Extract { url: String, uid: String },
    Ingredients { text: String },
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [command, url, uid] if command == "extract" => Some(Command::Extract {
            url: url.clone(),
            uid: uid.clone(),
        }),
        [command, words @ ..] if command == "ingredients" && !words.is_empty() => {
            Some(Command::Ingredients {
                text: words.join(" "),
            })
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        error!("Unrecognized arguments: {:?}", args);
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let config = AppConfig::load()?;
    debug!("Loaded configuration: {:?}", config.matching);
    let extractor = RecipeExtractor::from_config(&config)?;

    match command {
        Command::Extract { url, uid } => {
            let recipe = extractor.extract(&url, &uid).await?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        Command::Ingredients { text } => {
            let ingredients = extractor.extract_ingredients(&text).await?;
            println!("{}", serde_json::to_string_pretty(&ingredients)?);
        }
    }

    Ok(())
}
