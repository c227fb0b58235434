use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{LocalSet, spawn_local};

use crate::catalog::{self, CatalogLoad};
use crate::commands::{Command, HELP};
use crate::config::{Config, EnsureOutcome};
use crate::error::{AuthError, FeedFetchError};
use crate::feed::{FeedFetcher, FeedOutcome, FeedState};
use crate::filter::FilterState;
use crate::logger::init_logger;
use crate::models::{Article, Identity, OptionCatalog, OptionFamily};
use crate::providers::{NewsProvider, ProviderClient};
use crate::render::{format_detail, format_grid, format_options};
use crate::sequence::{RequestSequence, Ticket};
use crate::session::{AuthBackend, FirebaseAuth, NoIdentityProvider, SessionContext};
use crate::summarizer::{ChatBackend, DetailState, Summarizer};

pub struct RunOptions {
    pub provider: Option<NewsProvider>,
    pub no_auth: bool,
    pub no_ai: bool,
    pub verbose: bool,
}

pub async fn run(opts: RunOptions) -> Result<()> {
    // 0) Initialize logger
    init_logger(opts.verbose)?;

    // 1) Ensure config exists
    let config_outcome: EnsureOutcome = Config::ensure_user_config()?;
    if config_outcome.created {
        info!(
            "Config file created at {}. Please edit it and restart the app.",
            config_outcome.path.display()
        );
        println!(
            "Config file created at {}. Please edit it and restart.",
            config_outcome.path.display()
        );
        return Ok(());
    }

    let cfg = Config::get_user_config()?;
    debug!("User config loaded");

    // 2) Validate config based on enabled features
    let provider = opts.provider.unwrap_or(cfg.provider);
    let Some(api_key) = cfg.news_api_key(provider) else {
        error!(
            "No API key configured for provider {}. Set {}_api_key in the config.",
            provider.name(),
            provider.name()
        );
        return Ok(());
    };

    if !opts.no_auth && cfg.firebase_api_key().is_none() {
        error!("Sign-in is not configured. Set firebase_api_key or use --no-auth.");
        return Ok(());
    }

    // 3) Create HTTP client
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    debug!("HTTP client created");

    let summarizer = if opts.no_ai {
        info!("--no-ai flag set, summaries disabled");
        None
    } else if let Some(key) = cfg.summary_api_key() {
        Some(Rc::new(Summarizer::new(ChatBackend::new(
            key,
            &cfg.summary_api_base,
            &cfg.summary_model,
        ))))
    } else {
        warn!("No summary_api_key configured, summaries disabled");
        None
    };

    let session = match cfg.firebase_api_key() {
        _ if opts.no_auth => {
            info!("--no-auth flag set, continuing as guest");
            SessionContext::with_identity(AuthBackend::Disabled(NoIdentityProvider), Identity::guest())
        }
        Some(key) => SessionContext::new(AuthBackend::Firebase(FirebaseAuth::new(
            http.clone(),
            key.to_string(),
        ))),
        None => SessionContext::new(AuthBackend::Disabled(NoIdentityProvider)),
    };

    let client = ProviderClient::new(http, provider, api_key.to_string());
    info!("Using news provider {}", provider.name());

    // 4) Run the session loop on one thread
    let local = LocalSet::new();
    local
        .run_until(async move {
            let (app, rx) = App::new(Rc::new(session), client, summarizer, &cfg.default_category);
            app.run(rx).await
        })
        .await
}

enum Event {
    Input(String),
    InputClosed,
    CatalogLoaded {
        ticket: Ticket,
        load: CatalogLoad,
    },
    FeedLoaded {
        ticket: Ticket,
        result: Result<Vec<Article>, FeedFetchError>,
    },
    SummaryReady {
        ticket: Ticket,
        text: String,
    },
    SignedIn(Result<Identity, AuthError>),
    SignedOut(Result<(), AuthError>),
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct App {
    session: Rc<SessionContext<AuthBackend>>,
    client: ProviderClient,
    fetcher: FeedFetcher,
    summarizer: Option<Rc<Summarizer<ChatBackend>>>,
    default_category: String,
    filter: FilterState,
    catalog: OptionCatalog,
    catalog_sequence: RequestSequence,
    feed: FeedState,
    detail: DetailState,
    mounted: bool,
    tx: mpsc::UnboundedSender<Event>,
}

impl App {
    fn new(
        session: Rc<SessionContext<AuthBackend>>,
        client: ProviderClient,
        summarizer: Option<Rc<Summarizer<ChatBackend>>>,
        default_category: &str,
    ) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App {
            session,
            fetcher: FeedFetcher::new(client.clone()),
            client,
            summarizer,
            default_category: default_category.to_string(),
            filter: FilterState::new(default_category),
            catalog: OptionCatalog::default(),
            catalog_sequence: RequestSequence::default(),
            feed: FeedState::default(),
            detail: DetailState::default(),
            mounted: false,
            tx,
        };
        (app, rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) -> Result<()> {
        spawn_input_reader(self.tx.clone());
        let mut session_rx = self.session.subscribe();

        println!("newsdesk: type `help` for commands");
        self.on_session_change();

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if self.handle(event) == Flow::Quit {
                        break;
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.on_session_change();
                }
            }
        }

        info!("Session ended");
        Ok(())
    }

    fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Input(line) => match Command::parse(&line) {
                Ok(command) => return self.handle_command(command),
                Err(message) if message.is_empty() => {}
                Err(message) => println!("{message}"),
            },
            Event::InputClosed => return Flow::Quit,
            Event::CatalogLoaded { ticket, load } => {
                if !self.catalog_sequence.is_current(ticket) {
                    debug!("Discarding catalog from a previous view");
                    return Flow::Continue;
                }
                for failure in &load.failures {
                    println!("({} options unavailable)", failure.family);
                }
                self.catalog = load.catalog;
            }
            Event::FeedLoaded { ticket, result } => match self.feed.complete(ticket, result) {
                FeedOutcome::Stale => {}
                FeedOutcome::Applied(_) | FeedOutcome::Failed => {
                    if self.feed.is_empty_result() {
                        info!("Empty feed for {:?}", self.filter.selection());
                    }
                    println!("{}", format_grid(&self.filter.label(&self.catalog), self.feed.articles()));
                }
            },
            Event::SummaryReady { ticket, text } => {
                if self.detail.complete(ticket, text) {
                    println!("{}", format_detail(self.detail.view()));
                }
            }
            Event::SignedIn(Ok(identity)) => println!("Signed in as {}", identity.display_name),
            Event::SignedIn(Err(e)) => println!("Sign-in failed: {e}"),
            Event::SignedOut(Ok(())) => println!("Signed out."),
            Event::SignedOut(Err(e)) => println!("Sign-out failed: {e}"),
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Help => println!("{HELP}"),
            Command::Quit => return Flow::Quit,
            Command::WhoAmI => match self.session.current_identity() {
                Some(identity) => {
                    let avatar = identity
                        .avatar_url
                        .map(|u| format!(" ({u})"))
                        .unwrap_or_default();
                    println!("{} [{}]{avatar}", identity.display_name, identity.uid);
                }
                None => println!("Not signed in."),
            },
            Command::Login { email, password } => self.sign_in(email, password),
            Command::Logout => self.sign_out(),
            _ if !self.mounted => println!("Sign in first: login <email> <password>"),
            Command::Options(family) => self.print_options(family),
            Command::Category(input) => {
                if input.trim().is_empty() {
                    self.filter.select_category("");
                } else if self.catalog.categories.is_empty() {
                    self.filter.select_category(&input);
                } else if let Some(category) = self.catalog.resolve_category(&input) {
                    self.filter.select_category(&category);
                } else {
                    println!("Unknown category `{input}`, type `categories`");
                    return Flow::Continue;
                }
                self.start_fetch();
            }
            Command::Country(input) => {
                let resolved = resolve_code(&self.catalog.countries, &input, |c| {
                    self.catalog.resolve_country(c)
                });
                match resolved {
                    Ok(code) => {
                        self.filter.select_country(&code);
                        self.start_fetch();
                    }
                    Err(()) => println!("Unknown country `{input}`, type `countries`"),
                }
            }
            Command::Language(input) => {
                let resolved = resolve_code(&self.catalog.languages, &input, |l| {
                    self.catalog.resolve_language(l)
                });
                match resolved {
                    Ok(code) => {
                        self.filter.select_language(&code);
                        self.start_fetch();
                    }
                    Err(()) => println!("Unknown language `{input}`, type `languages`"),
                }
            }
            Command::Search(text) => {
                if self.filter.submit_query(&text) {
                    self.start_fetch();
                } else {
                    println!("Type something to search for.");
                }
            }
            Command::Clear => {
                if self.filter.clear_query() {
                    self.start_fetch();
                } else {
                    println!("No search to clear.");
                }
            }
            Command::Refresh => self.start_fetch(),
            Command::Open(n) => match self.feed.article(n - 1).cloned() {
                Some(article) => {
                    self.detail.select(article);
                    println!("{}", format_detail(self.detail.view()));
                }
                None => println!("No article {n}."),
            },
            Command::Close => {
                if self.detail.article().is_none() {
                    println!("No article is open.");
                }
                self.detail.close();
            }
            Command::Summarize => self.summarize(),
        }
        Flow::Continue
    }

    fn on_session_change(&mut self) {
        let authenticated = self.session.is_authenticated();
        if authenticated && !self.mounted {
            self.mount();
        } else if !authenticated && self.mounted {
            self.unmount();
        }
    }

    /// Show the feed view: one catalog load per mount, then the default feed.
    fn mount(&mut self) {
        info!("Mounting feed view");
        self.mounted = true;
        self.filter = FilterState::new(&self.default_category);
        self.catalog = OptionCatalog::default();

        let ticket = self.catalog_sequence.issue();
        let client = self.client.clone();
        let tx = self.tx.clone();
        spawn_local(async move {
            let load = catalog::load(&client).await;
            let _ = tx.send(Event::CatalogLoaded { ticket, load });
        });

        self.start_fetch();
    }

    fn unmount(&mut self) {
        info!("Unmounting feed view");
        self.mounted = false;
        self.catalog_sequence.invalidate();
        self.catalog = OptionCatalog::default();
        self.feed.reset();
        self.detail.close();
    }

    fn start_fetch(&mut self) {
        if self.feed.is_loading() {
            debug!("Superseding in-flight feed request");
        }
        let ticket = self.feed.begin();
        let selection = self.filter.selection();
        debug!("Fetching feed for {:?}", selection);
        println!("Loading articles...");

        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        spawn_local(async move {
            let result = fetcher.fetch(&selection).await;
            let _ = tx.send(Event::FeedLoaded { ticket, result });
        });
    }

    fn summarize(&mut self) {
        let Some(summarizer) = self.summarizer.clone() else {
            println!("Summaries are disabled.");
            return;
        };
        let Some((ticket, article)) = self.detail.begin_summary() else {
            if self.detail.is_summarizing() {
                println!("Already generating a summary.");
            } else {
                println!("Open an article first: open <n>");
            }
            return;
        };

        println!("Generating...");
        let tx = self.tx.clone();
        spawn_local(async move {
            let text = summarizer.summarize(&article).await;
            let _ = tx.send(Event::SummaryReady { ticket, text });
        });
    }

    fn sign_in(&mut self, email: String, password: String) {
        if let Some(identity) = self.session.current_identity() {
            println!("Already signed in as {}", identity.display_name);
            return;
        }
        println!("Signing in...");
        let session = Rc::clone(&self.session);
        let tx = self.tx.clone();
        spawn_local(async move {
            let result = session.sign_in(&email, &password).await;
            let _ = tx.send(Event::SignedIn(result));
        });
    }

    fn sign_out(&mut self) {
        let session = Rc::clone(&self.session);
        let tx = self.tx.clone();
        spawn_local(async move {
            let result = session.sign_out().await;
            let _ = tx.send(Event::SignedOut(result));
        });
    }

    fn print_options(&self, family: OptionFamily) {
        println!("{}", format_options(&self.catalog, family));
    }
}

/// Empty input clears the family. Unknown input is accepted as a raw code
/// only when the catalog for that family failed to load.
fn resolve_code(
    table: &BTreeMap<String, String>,
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ()> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(String::new());
    }
    match lookup(input) {
        Some(code) => Ok(code),
        None if table.is_empty() => Ok(input.to_string()),
        None => Err(()),
    }
}

fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>) {
    spawn_local(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(Event::Input(line)).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send(Event::InputClosed);
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    let _ = tx.send(Event::InputClosed);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::article;
    use crate::models::Summary;
    use crate::summarizer::DetailView;

    fn app(session: SessionContext<AuthBackend>) -> (App, mpsc::UnboundedReceiver<Event>) {
        let client = ProviderClient::new(
            reqwest::Client::new(),
            NewsProvider::NewsApi,
            "test-key".to_string(),
        );
        App::new(Rc::new(session), client, None, "general")
    }

    fn signed_out() -> SessionContext<AuthBackend> {
        SessionContext::new(AuthBackend::Disabled(NoIdentityProvider))
    }

    fn guest() -> SessionContext<AuthBackend> {
        SessionContext::with_identity(AuthBackend::Disabled(NoIdentityProvider), Identity::guest())
    }

    fn input(line: &str) -> Event {
        Event::Input(line.to_string())
    }

    fn catalog_with(category: &str) -> CatalogLoad {
        CatalogLoad {
            catalog: OptionCatalog {
                categories: vec![category.to_string()],
                ..Default::default()
            },
            failures: Vec::new(),
        }
    }

    // Spawned requests only run once the test yields, so state is asserted
    // before any of them can resolve.
    #[tokio::test]
    async fn test_feed_commands_refused_until_signed_in() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(signed_out());
                app.on_session_change();
                assert!(!app.mounted);

                for line in ["category technology", "search rust", "country US", "refresh"] {
                    assert!(app.handle(input(line)) == Flow::Continue);
                    assert!(!app.feed.is_loading(), "`{line}` started a fetch");
                }
                assert_eq!(app.filter.selection().category.as_deref(), Some("general"));
                assert!(app.handle(input("quit")) == Flow::Quit);
            })
            .await;
    }

    #[tokio::test]
    async fn test_mount_fetches_default_category() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(guest());
                app.on_session_change();
                assert!(app.mounted);
                assert!(app.feed.is_loading());
                assert_eq!(app.filter.selection().category.as_deref(), Some("general"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_blank_search_does_not_fetch() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(guest());
                app.on_session_change();

                let ticket = app.feed.begin();
                app.handle(Event::FeedLoaded {
                    ticket,
                    result: Ok(vec![article("a")]),
                });
                assert!(!app.feed.is_loading());

                app.handle(input("search    "));
                assert!(!app.feed.is_loading());
                assert!(!app.filter.is_searching());
                assert_eq!(app.feed.articles().len(), 1);

                app.handle(input("search rust"));
                assert!(app.feed.is_loading());
                assert!(app.filter.is_searching());
            })
            .await;
    }

    #[tokio::test]
    async fn test_sign_out_retires_in_flight_results() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(guest());
                app.on_session_change();

                let ticket = app.feed.begin();
                app.handle(Event::FeedLoaded {
                    ticket,
                    result: Ok(vec![article("a")]),
                });
                app.handle(input("open 1"));
                let (summary_ticket, _) = app.detail.begin_summary().unwrap();
                let catalog_ticket = app.catalog_sequence.issue();
                let feed_ticket = app.feed.begin();

                app.session.sign_out().await.unwrap();
                app.on_session_change();
                assert!(!app.mounted);
                assert!(!app.feed.is_loading());

                app.handle(Event::FeedLoaded {
                    ticket: feed_ticket,
                    result: Ok(vec![article("late")]),
                });
                app.handle(Event::CatalogLoaded {
                    ticket: catalog_ticket,
                    load: catalog_with("technology"),
                });
                app.handle(Event::SummaryReady {
                    ticket: summary_ticket,
                    text: "late summary".to_string(),
                });

                assert!(app.feed.articles().is_empty());
                assert_eq!(app.catalog, OptionCatalog::default());
                assert_eq!(app.detail.view(), &DetailView::Closed);
            })
            .await;
    }

    #[tokio::test]
    async fn test_stale_catalog_is_discarded() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(guest());
                app.on_session_change();

                let old = app.catalog_sequence.issue();
                let current = app.catalog_sequence.issue();
                app.handle(Event::CatalogLoaded {
                    ticket: old,
                    load: catalog_with("sports"),
                });
                assert!(app.catalog.categories.is_empty());

                app.handle(Event::CatalogLoaded {
                    ticket: current,
                    load: catalog_with("technology"),
                });
                assert_eq!(app.catalog.categories, vec!["technology"]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_summary_applies_to_open_article() {
        LocalSet::new()
            .run_until(async {
                let (mut app, _rx) = app(guest());
                app.on_session_change();

                let ticket = app.feed.begin();
                app.handle(Event::FeedLoaded {
                    ticket,
                    result: Ok(vec![article("a"), article("b")]),
                });
                app.handle(input("open 1"));
                let (stale, _) = app.detail.begin_summary().unwrap();
                app.handle(input("open 2"));

                app.handle(Event::SummaryReady {
                    ticket: stale,
                    text: "about a".to_string(),
                });
                assert_eq!(
                    app.detail.view(),
                    &DetailView::Open {
                        article: article("b"),
                        summary: None
                    }
                );

                let (current, _) = app.detail.begin_summary().unwrap();
                app.handle(Event::SummaryReady {
                    ticket: current,
                    text: "about b".to_string(),
                });
                assert_eq!(
                    app.detail.view(),
                    &DetailView::Open {
                        article: article("b"),
                        summary: Some(Summary {
                            article_id: "b".to_string(),
                            text: "about b".to_string(),
                        })
                    }
                );
            })
            .await;
    }

    fn table() -> BTreeMap<String, String> {
        BTreeMap::from([("United States".to_string(), "US".to_string())])
    }

    #[test]
    fn test_resolve_code_known_and_unknown() {
        let catalog = OptionCatalog {
            countries: table(),
            ..Default::default()
        };
        let lookup = |c: &str| catalog.resolve_country(c);
        assert_eq!(resolve_code(&catalog.countries, "united states", lookup), Ok("US".to_string()));
        assert_eq!(resolve_code(&catalog.countries, "Narnia", lookup), Err(()));
        assert_eq!(resolve_code(&catalog.countries, "  ", lookup), Ok(String::new()));
    }

    #[test]
    fn test_resolve_code_accepts_raw_code_without_catalog() {
        let empty = BTreeMap::new();
        assert_eq!(resolve_code(&empty, "de", |_| None), Ok("de".to_string()));
    }
}
