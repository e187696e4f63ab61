use api::api::start_server;

#[macro_use]
extern crate diesel;

use clap::{Parser, Subcommand};
use config::API_URL;
use utils::is_server_running;

use crate::{
    api::dtos::todo::UpdateTodoDTO, models::todo_model::Priority, todo_commands::NewTodoOptions,
};

mod api;
mod config;
mod errors;
mod models;
mod realtime;
mod schema;
mod store;
mod sync;
mod todo_commands;
mod ui;
mod utils;

#[derive(Debug, Subcommand)]
enum Commands {
    Login,
    Signup,
    Logout,
    /// Show who the saved login belongs to
    Me,
    #[clap(alias = "ls")]
    List {
        /// Only todos you own
        #[clap(long)]
        mine: bool,
    },
    #[clap(alias = "c")]
    Create {
        text: Option<String>,
        /// Share with the whole team
        #[clap(long)]
        team: bool,
        #[clap(short, long)]
        priority: Option<Priority>,
        /// Due this many hours from now
        #[clap(long = "due-in")]
        due_in: Option<i64>,
    },
    #[clap(alias = "t")]
    Toggle { id: String },
    Edit {
        id: String,
        #[clap(long)]
        text: Option<String>,
        #[clap(short, long)]
        priority: Option<Priority>,
        #[clap(long)]
        completed: Option<bool>,
    },
    #[clap(alias = "rm")]
    Delete { id: String },
    Stats,
    /// Live board of personal and team todos
    #[clap(alias = "w")]
    Watch,
    /// List registered users, read directly from the store
    Users,
}

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = "Manage team todos from command line")]
struct TodoArgs {
    #[clap(short = 's', long = "start-server")]
    start_server: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

// Signup a user through cli
fn prompt_signup() -> anyhow::Result<()> {
    use inquire::{Password, Text};

    println!("Signup to Todo");

    let name = Text::new("Name").prompt()?;

    let email = Text::new("Email").prompt()?;

    let pass = Password::new("Password").prompt()?;

    todo_commands::signup(name, email, pass)
}

// Prompt login
fn prompt_login() -> anyhow::Result<()> {
    use inquire::{Password, Text};

    println!("Login to Todo");

    let email = Text::new("Email")
        .with_help_message("Enter Email")
        .prompt()?;

    let pass = Password::new("Password").prompt()?;

    todo_commands::login(email, pass)
}

/// Wrapper function for looping a prompt function
/// if error occurs
fn super_prompt(title: &str, function: &dyn Fn() -> anyhow::Result<()>) {
    loop {
        println!("\n{}\n", title);

        match function() {
            Ok(_) => break,
            Err(e) => {
                eprintln!("{:#}", e);

                let response = inquire::Confirm::new("Continue")
                    .with_default(true)
                    .prompt();

                if let Ok(true) = response {
                    continue;
                }

                break;
            }
        }
    }
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login => super_prompt("Login", &prompt_login),
        Commands::Signup => super_prompt("Signup", &prompt_signup),
        Commands::Logout => todo_commands::logout()?,
        Commands::Me => todo_commands::me()?,
        Commands::List { mine } => todo_commands::list_todos(mine)?,
        Commands::Create {
            text,
            team,
            priority,
            due_in,
        } => todo_commands::create_new_todo(NewTodoOptions {
            text,
            team,
            priority,
            due_in_hours: due_in,
        })?,
        Commands::Toggle { id } => todo_commands::toggle_todo(&id)?,
        Commands::Edit {
            id,
            text,
            priority,
            completed,
        } => todo_commands::edit_todo(
            &id,
            UpdateTodoDTO {
                text,
                completed,
                priority,
                due_date: None,
            },
        )?,
        Commands::Delete { id } => todo_commands::delete_todo(&id)?,
        Commands::Stats => todo_commands::show_stats()?,
        Commands::Watch => todo_commands::watch()?,
        Commands::Users => todo_commands::list_users()?,
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = TodoArgs::parse();

    if args.start_server {
        if is_server_running(API_URL.as_str()) {
            anyhow::bail!("Server already running on {}", API_URL.as_str());
        }

        println!("Starting Server on {}", API_URL.as_str());
        start_server()?;

        return Ok(());
    }

    // the client stays quiet unless asked
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::try_init().ok();
    }

    if let Some(command) = args.command {
        if let Err(e) = run_command(command) {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
