
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use sensordash::app::{AppError, Dashboard};
use sensordash::config::{ConfigError, DashboardConfig};
use sensordash::idle::ActivityKind;
use sensordash::net::types::{Reading, Sensor, SensorId, SensorPatch};
use sensordash::router::{LOGIN_PATH, REGISTER_PATH, Route, SENSORS_PATH, sensor_path};
use sensordash::views::ActionError;
use sensordash::views::chart::ChartData;
use sensordash::views::forms::{FilterForm, LoginForm, ReadingForm, RegisterForm, SensorForm};
use sensordash::views::sensor_detail::{DetailState, LATEST_COUNT, SensorDetailView};
use sensordash::views::sensors_list::{SensorsListState, SensorsListView};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{0}")]
    Action(#[from] ActionError),
    #[error("{0}")]
    Request(String),
    #[error("not logged in; run `sensordash login` first")]
    NotAuthenticated,
    #[error("nothing to update; pass at least one field to change")]
    EmptyUpdate,
    #[error("not deleted; re-run with --yes to confirm")]
    Unconfirmed,
    #[error("output encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sensordash", about = "Sensor dashboard terminal client")]
struct Cli {
    #[arg(long, env = "SENSORDASH_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SENSORDASH_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Log verbosity on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "SENSORDASH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SENSORDASH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Status,
    Sensors(SensorsCommand),
    Readings(ReadingsCommand),
    /// Plot a sensor's readings as sparklines.
    Chart(RangeArgs),
    /// Interactive session with idle auto-logout.
    Shell,
}

#[derive(Args, Debug)]
struct SensorsCommand {
    #[command(subcommand)]
    command: SensorsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SensorsSubcommand {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Search term.
        #[arg(long)]
        q: Option<String>,
    },
    Show {
        id: SensorId,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Partial update; only the given fields change.
    Update {
        id: SensorId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a sensor and all of its readings.
    Delete {
        id: SensorId,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct ReadingsCommand {
    #[command(subcommand)]
    command: ReadingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReadingsSubcommand {
    List {
        #[command(flatten)]
        range: RangeArgs,
        /// Show only the most recent readings, newest first.
        #[arg(long, default_value_t = false)]
        latest: bool,
    },
    Add {
        sensor_id: SensorId,
        #[arg(long, allow_hyphen_values = true)]
        temperature: String,
        #[arg(long)]
        humidity: String,
        /// RFC 3339, or local `YYYY-MM-DDTHH:MM[:SS]`.
        #[arg(long)]
        timestamp: String,
    },
}

#[derive(Args, Debug)]
struct RangeArgs {
    sensor_id: SensorId,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
}

impl RangeArgs {
    fn filter(&self) -> FilterForm {
        FilterForm { start: self.start.clone().unwrap_or_default(), end: self.end.clone().unwrap_or_default() }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = DashboardConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(token_file) = cli.token_file {
        config.token_file = token_file;
    }
    let app = Dashboard::from_config(config)?;
    let out = Output { json: cli.json };

    match cli.command {
        Command::Login { username, password } => run_login(&app, &out, LoginForm { username, password }).await,
        Command::Register { username, email, password } => {
            run_register(&app, &out, RegisterForm { username, email, password }).await
        }
        Command::Logout => {
            app.auth().logout();
            out.print(&serde_json::json!({ "authenticated": false }), || "Logged out.".to_owned())
        }
        Command::Status => run_status(&app, &out),
        Command::Sensors(sensors) => run_sensors(&app, &out, sensors.command).await,
        Command::Readings(readings) => run_readings(&app, &out, readings.command).await,
        Command::Chart(range) => run_chart(&app, &out, &range).await,
        Command::Shell => Shell::new(&app).run().await,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();
}

struct Output {
    json: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Resolve `path` through the guard; anything that lands on login means the
/// session is missing.
fn require(app: &Dashboard, path: &str) -> Result<(), CliError> {
    match app.open(path) {
        Route::Login { .. } => Err(CliError::NotAuthenticated),
        _ => Ok(()),
    }
}

// =============================================================================
// AUTH COMMANDS
// =============================================================================

async fn run_login(app: &Dashboard, out: &Output, form: LoginForm) -> Result<(), CliError> {
    app.open(LOGIN_PATH);
    let target = app.login_view(None).submit(&form).await?;
    out.print(&serde_json::json!({ "authenticated": true, "location": target }), || {
        format!("Logged in as {}.", form.username.trim())
    })
}

async fn run_register(app: &Dashboard, out: &Output, form: RegisterForm) -> Result<(), CliError> {
    app.open(REGISTER_PATH);
    let target = app.register_view(None).submit(&form).await?;
    out.print(&serde_json::json!({ "authenticated": true, "location": target }), || {
        format!("Registered and logged in as {}.", form.username.trim())
    })
}

fn run_status(app: &Dashboard, out: &Output) -> Result<(), CliError> {
    let config = app.config();
    let authenticated = app.session().is_authenticated();
    let status = serde_json::json!({
        "authenticated": authenticated,
        "base_url": config.base_url,
        "token_file": config.token_file,
    });
    out.print(&status, || {
        let state = if authenticated { "logged in" } else { "not logged in" };
        format!("{state} ({})\ntoken file: {}", config.base_url, config.token_file.display())
    })
}

// =============================================================================
// SENSOR COMMANDS
// =============================================================================

async fn run_sensors(app: &Dashboard, out: &Output, command: SensorsSubcommand) -> Result<(), CliError> {
    match command {
        SensorsSubcommand::List { page, q } => {
            require(app, SENSORS_PATH)?;
            let view = app.sensors_list_view();
            match q {
                Some(q) if page <= 1 => view.search(&q).await,
                Some(q) => {
                    view.search(&q).await;
                    view.load_page(page).await;
                }
                None => view.load_page(page).await,
            }
            let state = view.state();
            if let Some(error) = state.error {
                return Err(CliError::Request(error));
            }
            out.print(&state.sensors, || format_sensor_list(&state))
        }
        SensorsSubcommand::Show { id } => {
            require(app, &sensor_path(id))?;
            let view = app.sensor_detail_view(id);
            view.load_sensor().await;
            let state = view.state();
            match state.sensor {
                Some(sensor) => out.print(&sensor, || format_sensor(&sensor)),
                None => Err(CliError::Request(state.error.unwrap_or_default())),
            }
        }
        SensorsSubcommand::Create { name, model, description } => {
            require(app, SENSORS_PATH)?;
            let form = SensorForm { name, model, description: description.unwrap_or_default() };
            let sensor = app.sensors_list_view().create(&form).await?;
            out.print(&sensor, || format!("Created sensor {}.\n{}", sensor.id, format_sensor(&sensor)))
        }
        SensorsSubcommand::Update { id, name, model, description } => {
            require(app, &sensor_path(id))?;
            let patch = SensorPatch { name, model, description };
            if patch.is_empty() {
                return Err(CliError::EmptyUpdate);
            }
            let sensor = app
                .api()
                .patch_sensor(id, &patch)
                .await
                .map_err(|e| CliError::Request(e.user_message("Failed to update sensor")))?;
            out.print(&sensor, || format!("Updated.\n{}", format_sensor(&sensor)))
        }
        SensorsSubcommand::Delete { id, yes } => {
            require(app, &sensor_path(id))?;
            let view = app.sensor_detail_view(id);
            view.load_sensor().await;
            let Some(prompt) = view.delete_prompt() else {
                return Err(CliError::Request(view.state().error.unwrap_or_default()));
            };
            if !yes {
                eprintln!("{prompt}");
                return Err(CliError::Unconfirmed);
            }
            view.delete(true).await?;
            out.print(&serde_json::json!({ "deleted": id }), || format!("Deleted sensor {id}."))
        }
    }
}

// =============================================================================
// READING COMMANDS
// =============================================================================

/// Open the detail view for `range` and wait for its readings page.
async fn load_readings(app: &Dashboard, range: &RangeArgs) -> Result<SensorDetailView, CliError> {
    require(app, &sensor_path(range.sensor_id))?;
    let view = app.sensor_detail_view(range.sensor_id);
    let mut generation = view.apply_filter(&range.filter())?;
    if range.page > 1 {
        generation = view.go_to_page(range.page);
    }
    view.settled(generation).await;
    if let Some(error) = view.state().error {
        return Err(CliError::Request(error));
    }
    Ok(view)
}

async fn run_readings(app: &Dashboard, out: &Output, command: ReadingsSubcommand) -> Result<(), CliError> {
    match command {
        ReadingsSubcommand::List { range, latest } => {
            let view = load_readings(app, &range).await?;
            let state = view.state();
            let readings = if latest { view.latest(LATEST_COUNT) } else { state.readings.clone() };
            out.print(&readings, || format_readings(&readings, &state))
        }
        ReadingsSubcommand::Add { sensor_id, temperature, humidity, timestamp } => {
            require(app, &sensor_path(sensor_id))?;
            let view = app.sensor_detail_view(sensor_id);
            let reading = view.add_reading(&ReadingForm { temperature, humidity, timestamp }).await?;
            out.print(&reading, || format!("Added reading {}.\n{}", reading.id, format_reading(&reading)))
        }
    }
}

async fn run_chart(app: &Dashboard, out: &Output, range: &RangeArgs) -> Result<(), CliError> {
    let view = load_readings(app, range).await?;
    let chart = view.chart().borrow().clone();
    let chart = chart.map_or_else(|| ChartData::from_readings(&[]), |c| (*c).clone());
    out.print(&chart, || chart.render_text())
}

// =============================================================================
// FORMATTING
// =============================================================================

fn format_sensor(sensor: &Sensor) -> String {
    let mut text = format!("#{} {} ({})", sensor.id, sensor.name, sensor.model);
    if let Some(description) = sensor.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str("\n  ");
        text.push_str(description);
    }
    text
}

fn format_sensor_list(state: &SensorsListState) -> String {
    if state.sensors.is_empty() {
        return "No sensors.".to_owned();
    }
    let mut lines: Vec<String> =
        state.sensors.iter().map(|s| format!("{:>6}  {}  ({})", s.id, s.name, s.model)).collect();
    lines.push(format!(
        "page {} of {} ({} sensors)",
        state.pages.page,
        state.pages.total_pages(),
        state.pages.count.unwrap_or_default()
    ));
    lines.join("\n")
}

fn format_reading(reading: &Reading) -> String {
    format!(
        "{}  {:>6.1} °C  {:>5.1} %",
        reading.timestamp.format("%Y-%m-%d %H:%M:%S"),
        reading.temperature,
        reading.humidity
    )
}

fn format_readings(readings: &[Reading], state: &DetailState) -> String {
    if readings.is_empty() {
        return "No readings.".to_owned();
    }
    let mut lines: Vec<String> = readings.iter().map(format_reading).collect();
    lines.push(format!(
        "page {} of {} ({} readings)",
        state.pages.page,
        state.pages.total_pages(),
        state.pages.count.unwrap_or_default()
    ));
    lines.join("\n")
}

// =============================================================================
// SHELL
// =============================================================================

const SHELL_HELP: &str = "\
commands:
  login <username> <password>      register <username> <email> <password>
  sensors [search]                 open <path>         show <id>
  next | prev                      create <name> <model> [description]
  filter [start] [end]             latest              chart
  add <temperature> <humidity> <timestamp>
  edit <name> <model> [description]
  delete  (then `yes` to confirm)  logout              help | quit";

enum Screen {
    Auth(Option<String>),
    List(SensorsListView),
    Detail(SensorDetailView),
}

enum Flow {
    Continue,
    Quit,
}

struct Shell<'a> {
    app: &'a Dashboard,
    screen: Screen,
    pending_delete: bool,
}

impl<'a> Shell<'a> {
    fn new(app: &'a Dashboard) -> Self {
        Self { app, screen: Screen::Auth(None), pending_delete: false }
    }

    async fn run(mut self) -> Result<(), CliError> {
        println!("{SHELL_HELP}");
        self.enter_start().await;

        let app = self.app;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                () = app.idle_timed_out() => {
                    println!("Logged out after {}s of inactivity.", app.idle().window().as_secs());
                    self.screen = Screen::Auth(None);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    app.idle().record_activity(ActivityKind::KeyDown);
                    match self.dispatch(line.trim()).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(e) => println!("error: {e}"),
                    }
                    self.notice_forced_logout();
                }
            }
        }
        self.app.idle().stop();
        Ok(())
    }

    /// Open the landing screen. A stale stored token is rejected by the first
    /// load, which has to be noticed before the prompt appears.
    async fn enter_start(&mut self) {
        let start = self.app.open(SENSORS_PATH);
        self.enter(start).await;
        self.notice_forced_logout();
    }

    /// A 401 from any request navigates to login behind our back.
    fn notice_forced_logout(&mut self) {
        let at_login = self.app.current_path().starts_with(LOGIN_PATH);
        if at_login && !matches!(self.screen, Screen::Auth(_)) {
            println!("Session ended. Log in again.");
            self.app.idle().stop();
            self.screen = Screen::Auth(None);
        }
    }

    async fn enter(&mut self, route: Route) {
        self.pending_delete = false;
        match route {
            Route::Login { redirect } | Route::Register { redirect } => {
                println!("Not logged in. Use `login` or `register`.");
                self.screen = Screen::Auth(redirect);
            }
            Route::Sensors => {
                self.app.idle().start();
                let view = self.app.sensors_list_view();
                view.load().await;
                print_list(&view.state());
                self.screen = Screen::List(view);
            }
            Route::SensorDetail { id } => {
                self.app.idle().start();
                let view = self.app.sensor_detail_view(id);
                view.open().await;
                print_detail(&view);
                self.screen = Screen::Detail(view);
            }
        }
    }

    async fn dispatch(&mut self, line: &str) -> Result<Flow, CliError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(Flow::Continue);
        };
        if command != "yes" {
            self.pending_delete = false;
        }
        match (command, args) {
            ("quit" | "exit", _) => return Ok(Flow::Quit),
            ("help", _) => println!("{SHELL_HELP}"),
            ("login", [username, password]) => {
                let redirect = self.auth_redirect();
                let form = LoginForm { username: (*username).to_owned(), password: (*password).to_owned() };
                let target = self.app.login_view(redirect).submit(&form).await?;
                let route = self.app.open(&target);
                self.enter(route).await;
            }
            ("register", [username, email, password]) => {
                let redirect = self.auth_redirect();
                let form = RegisterForm {
                    username: (*username).to_owned(),
                    email: (*email).to_owned(),
                    password: (*password).to_owned(),
                };
                let target = self.app.register_view(redirect).submit(&form).await?;
                let route = self.app.open(&target);
                self.enter(route).await;
            }
            ("logout", _) => {
                self.app.auth().logout();
                self.app.idle().stop();
                self.screen = Screen::Auth(None);
                println!("Logged out.");
            }
            ("open", [path]) => {
                let route = self.app.open(path);
                self.enter(route).await;
            }
            ("show", [id]) => match id.parse::<SensorId>() {
                Ok(id) => {
                    let route = self.app.open(&sensor_path(id));
                    self.enter(route).await;
                }
                Err(_) => println!("usage: show <id>"),
            },
            ("sensors", query) => {
                let route = self.app.open(SENSORS_PATH);
                if query.is_empty() || route != Route::Sensors {
                    self.enter(route).await;
                } else {
                    let view = self.app.sensors_list_view();
                    view.search(&query.join(" ")).await;
                    print_list(&view.state());
                    self.screen = Screen::List(view);
                }
            }
            _ => self.dispatch_screen(command, args).await?,
        }
        Ok(Flow::Continue)
    }

    async fn dispatch_screen(&mut self, command: &str, args: &[&str]) -> Result<(), CliError> {
        match (&self.screen, command, args) {
            (Screen::List(view), "next", _) => {
                if view.next_page().await {
                    print_list(&view.state());
                } else {
                    println!("Already on the last page.");
                }
            }
            (Screen::List(view), "prev", _) => {
                if view.prev_page().await {
                    print_list(&view.state());
                } else {
                    println!("Already on the first page.");
                }
            }
            (Screen::List(view), "create", [name, model, description @ ..]) => {
                let form = SensorForm {
                    name: (*name).to_owned(),
                    model: (*model).to_owned(),
                    description: description.join(" "),
                };
                let sensor = view.create(&form).await?;
                println!("Created sensor {}.", sensor.id);
                print_list(&view.state());
            }
            (Screen::Detail(view), "next" | "prev", _) => {
                let generation = if command == "next" { view.next_page() } else { view.prev_page() };
                match generation {
                    Some(generation) => {
                        view.settled(generation).await;
                        print_detail(view);
                    }
                    None => println!("No more pages."),
                }
            }
            (Screen::Detail(view), "filter", bounds) => {
                let form = FilterForm {
                    start: bounds.first().copied().unwrap_or_default().to_owned(),
                    end: bounds.get(1).copied().unwrap_or_default().to_owned(),
                };
                let generation = view.apply_filter(&form)?;
                view.settled(generation).await;
                print_detail(view);
            }
            (Screen::Detail(view), "latest", _) => {
                let state = view.state();
                println!("{}", format_readings(&view.latest(LATEST_COUNT), &state));
            }
            (Screen::Detail(view), "chart", _) => {
                let chart = view.chart().borrow().clone();
                match chart {
                    Some(chart) => print!("{}", chart.render_text()),
                    None => println!("Chart data not loaded yet."),
                }
            }
            (Screen::Detail(view), "add", [temperature, humidity, timestamp]) => {
                let form = ReadingForm {
                    temperature: (*temperature).to_owned(),
                    humidity: (*humidity).to_owned(),
                    timestamp: (*timestamp).to_owned(),
                };
                let reading = view.add_reading(&form).await?;
                println!("Added reading {}.", reading.id);
                print_detail(view);
            }
            (Screen::Detail(view), "edit", [name, model, description @ ..]) => {
                if !view.start_edit() {
                    println!("Sensor not loaded.");
                    return Ok(());
                }
                let form = SensorForm {
                    name: (*name).to_owned(),
                    model: (*model).to_owned(),
                    description: description.join(" "),
                };
                if let Err(e) = view.save(&form).await {
                    view.cancel_edit();
                    return Err(e.into());
                }
                print_detail(view);
            }
            (Screen::Detail(view), "delete", _) => match view.delete_prompt() {
                Some(prompt) => {
                    println!("{prompt} Type `yes` to confirm.");
                    self.pending_delete = true;
                }
                None => println!("Sensor not loaded."),
            },
            (Screen::Detail(view), "yes", _) if self.pending_delete => {
                self.pending_delete = false;
                let view = view.clone();
                if view.delete(true).await? {
                    println!("Deleted.");
                    self.enter(Route::Sensors).await;
                }
            }
            _ => println!("Unknown command here. Type `help`."),
        }
        Ok(())
    }

    fn auth_redirect(&self) -> Option<String> {
        match &self.screen {
            Screen::Auth(redirect) => redirect.clone(),
            _ => None,
        }
    }
}

fn print_list(state: &SensorsListState) {
    if let Some(error) = &state.error {
        println!("error: {error}");
    }
    println!("{}", format_sensor_list(state));
}

fn print_detail(view: &SensorDetailView) {
    let state = view.state();
    if let Some(sensor) = &state.sensor {
        println!("{}", format_sensor(sensor));
    }
    if let Some(error) = &state.error {
        println!("error: {error}");
    }
    println!("{}", format_readings(&view.latest(LATEST_COUNT), &state));
}
