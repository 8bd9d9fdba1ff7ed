//! Command handlers for the interactive client.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use pinmap_core::models::{
    NearbyQuery, Page, PageRequest, Pin, PinCreateRequest, Post, SignupRequest, DEFAULT_PAGE_SIZE,
};
use pinmap_core::{AuthService, BootstrapOutcome, Config, FormFeedback};

use crate::commands::{Command, PinCommand, PostCommand};
use crate::navigator::TerminalNavigator;

/// Whether the REPL keeps going after a command.
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    auth: AuthService,
    config: Config,
    navigator: Arc<TerminalNavigator>,
}

impl App {
    pub fn new(auth: AuthService, config: Config, navigator: Arc<TerminalNavigator>) -> Self {
        Self { auth, config, navigator }
    }

    pub fn prompt(&self) -> String {
        match self.auth.session().user() {
            Some(user) => format!("pinmap ({})> ", user.nickname),
            None => "pinmap> ".to_string(),
        }
    }

    /// Try to pick up the session left by a previous run.
    pub async fn bootstrap(&self) {
        match self.auth.bootstrap().await {
            BootstrapOutcome::Restored(user) => println!("Welcome back, {}.", user.nickname),
            BootstrapOutcome::Anonymous => println!("Browsing signed out. Run `login` to sign in."),
            BootstrapOutcome::AlreadyAuthenticated | BootstrapOutcome::AlreadyRan => {}
        }
    }

    pub async fn run(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::Login { email } => self.login(email).await?,
            Command::Signup { email, nickname } => self.signup(email, nickname).await?,
            Command::Me => self.me().await?,
            Command::Logout => self.logout().await,
            Command::Pins { command } => self.pins(command).await?,
            Command::Posts { command } => self.posts(command).await?,
            Command::Status => self.status(),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Account
    // =========================================================================

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        self.navigator.show("/login");
        let email = match email {
            Some(email) => email,
            None => self.ask_email().await?,
        };
        let password = read_password().await?;

        match self.auth.login(&email, &password).await {
            Ok(user) => {
                self.navigator.show("/");
                self.config.last_email = Some(email.trim().to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Signed in as {} <{}>.", user.nickname, user.email);
            }
            Err(e) => print_feedback(&FormFeedback::login(&e)),
        }
        Ok(())
    }

    /// Prompt for the email, offering the last one used as the default.
    async fn ask_email(&self) -> Result<String> {
        let prompt = match self.config.last_email {
            Some(ref last) => format!("Email [{}]: ", last),
            None => "Email: ".to_string(),
        };
        let input = read_line(prompt).await?.unwrap_or_default();
        let input = input.trim();
        match (input.is_empty(), &self.config.last_email) {
            (true, Some(last)) => Ok(last.clone()),
            _ => Ok(input.to_string()),
        }
    }

    async fn signup(&mut self, email: String, nickname: String) -> Result<()> {
        self.navigator.show("/signup");
        let password = read_password().await?;
        let request = SignupRequest::new(email, password, nickname);

        match self.auth.signup(&request).await {
            Ok(member) => {
                self.navigator.show("/login");
                self.config.last_email = Some(member.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Account created for {}. Run `login` to sign in.", member.email);
            }
            Err(e) => print_feedback(&FormFeedback::signup(&e)),
        }
        Ok(())
    }

    async fn me(&self) -> Result<()> {
        self.navigator.show("/me");
        let user = self.auth.refresh_profile().await?;
        println!("#{} {} <{}>", user.id, user.nickname, user.email);
        if user.is_admin() {
            println!("role: {} (administrator)", user.role);
        } else {
            println!("role: {}", user.role);
        }
        Ok(())
    }

    async fn logout(&self) {
        match self.auth.logout().await {
            Ok(()) => println!("Signed out."),
            Err(e) => println!("Signed out locally (server said: {}).", e),
        }
        self.navigator.show("/");
    }

    fn status(&self) {
        let session = self.auth.session().snapshot();
        let api = self.auth.api();
        println!("server:  {}", api.base_url());
        match (&session.access_token, &session.user) {
            (Some(_), Some(user)) => {
                println!("session: signed in as {} <{}>", user.nickname, user.email)
            }
            (Some(_), None) => println!("session: token held, profile not loaded"),
            (None, _) => println!("session: signed out"),
        }
        let renewal = api.refresh_coordinator();
        println!("renewal: {:?} ({} so far)", renewal.state(), renewal.renewals());
    }

    // =========================================================================
    // Map data
    // =========================================================================

    async fn pins(&self, command: PinCommand) -> Result<()> {
        let api = self.auth.api();
        match command {
            PinCommand::Nearby { lat, lng, radius, page } => {
                self.navigator.show("/map");
                let query = NearbyQuery::new(lat, lng)
                    .radius_km(radius)
                    .page(page, DEFAULT_PAGE_SIZE);
                print_page(&api.nearby_pins(&query).await?, format_pin);
            }
            PinCommand::Mine { page } => {
                self.navigator.show("/pins");
                let pins = api.my_pins(PageRequest::new(page, DEFAULT_PAGE_SIZE)).await?;
                print_page(&pins, format_pin);
            }
            PinCommand::Show { id } => {
                self.navigator.show(&format!("/pins/{}", id));
                println!("{}", format_pin(&api.pin(id).await?));
            }
            PinCommand::Create { lat, lng, description } => {
                let request = PinCreateRequest {
                    latitude: lat,
                    longitude: lng,
                    description: description.filter(|d| !d.trim().is_empty()),
                };
                let pin = api.create_pin(&request).await.context("Could not create pin")?;
                println!("Created {}", format_pin(&pin));
            }
        }
        Ok(())
    }

    async fn posts(&self, command: PostCommand) -> Result<()> {
        let api = self.auth.api();
        match command {
            PostCommand::List { keyword, page } => {
                self.navigator.show("/posts");
                let posts = api
                    .posts(PageRequest::new(page, DEFAULT_PAGE_SIZE), keyword.as_deref())
                    .await?;
                print_page(&posts, format_post);
            }
            PostCommand::Show { id } => {
                self.navigator.show(&format!("/posts/{}", id));
                let post = api.post(id).await?;
                println!("{}", format_post(&post));
                if !post.content.is_empty() {
                    println!("\n{}", post.content);
                }
            }
            PostCommand::Nearby { lat, lng, radius, page } => {
                self.navigator.show("/map");
                let query = NearbyQuery::new(lat, lng)
                    .radius_km(radius)
                    .page(page, DEFAULT_PAGE_SIZE);
                print_page(&api.nearby_posts(&query).await?, format_post);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_feedback(feedback: &FormFeedback) {
    println!("{}", feedback.message);
    for error in &feedback.field_errors {
        println!("  {}: {}", error.field, error.reason);
    }
}

fn print_page<T>(page: &Page<T>, format: fn(&T) -> String) {
    if page.is_empty() {
        println!("Nothing found.");
        return;
    }
    for item in &page.content {
        println!("{}", format(item));
    }
    let mut footer = format!(
        "page {} of {} ({} total)",
        page.number + 1,
        page.total_pages.max(1),
        page.total_elements
    );
    if page.has_next() {
        footer.push_str(&format!(", next: --page {}", page.number + 1));
    }
    println!("-- {}", footer);
}

fn format_pin(pin: &Pin) -> String {
    format!(
        "#{:<5} ({:.5}, {:.5})  {}",
        pin.id,
        pin.latitude,
        pin.longitude,
        pin.display_description()
    )
}

fn format_post(post: &Post) -> String {
    let location = post
        .location()
        .map(|(lat, lng)| format!(" @ ({:.5}, {:.5})", lat, lng))
        .unwrap_or_default();
    format!("#{:<5} {} by {}{}", post.id, post.title, post.author_display(), location)
}

// ============================================================================
// Input
// ============================================================================

/// Read one line from stdin without blocking the runtime. `None` on EOF.
pub async fn read_line(prompt: String) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input))
    })
    .await?
}

async fn read_password() -> Result<String> {
    let password = tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: ")).await??;
    Ok(password)
}
