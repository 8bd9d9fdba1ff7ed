//! REPL command grammar.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use pinmap_core::models::DEFAULT_RADIUS_KM;

/// One line typed at the prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true, name = "pinmap")]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        nickname: String,
    },
    /// Show the signed-in profile
    Me,
    /// Sign out and forget the refresh cookie
    Logout,
    /// Browse and create pins
    Pins {
        #[command(subcommand)]
        command: PinCommand,
    },
    /// Browse posts
    Posts {
        #[command(subcommand)]
        command: PostCommand,
    },
    /// Show the session state
    Status,
    /// Leave pinmap
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Subcommand)]
pub enum PinCommand {
    /// Pins near a point
    Nearby {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        /// Search radius in kilometres
        #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Your own pins
    Mine {
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// One pin by id
    Show { id: i64 },
    /// Drop a pin
    Create {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PostCommand {
    /// Latest posts, optionally filtered by keyword
    List {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// One post by id
    Show { id: i64 },
    /// Posts near a point
    Nearby {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
        #[arg(long, default_value_t = DEFAULT_RADIUS_KM)]
        radius: f64,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
}

/// Split a typed line into words. Single or double quotes group words
/// containing spaces.
pub fn split_words(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        bail!("Unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
