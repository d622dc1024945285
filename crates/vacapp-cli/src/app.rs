//! Wiring and command handlers for the `vacapp` binary.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use futures::future::join_all;
use tracing::{info, warn};

use vacapp_core::auth::{Permission, StoredCredentialsRefresher};
use vacapp_core::models::Cow;
use vacapp_core::utils::{format_date, truncate_string};
use vacapp_core::{ApiClient, AuthService, Config, CowCache, CowRecord, Gateway, Herd, LocalStore};

/// Width of the name column in the cow list
const NAME_WIDTH: usize = 20;

/// Width of the owner column in the cow list
const OWNER_WIDTH: usize = 26;

pub struct App {
    config: Config,
    auth: AuthService,
    herd: Herd,
    json: bool,
}

impl App {
    pub fn new(config: Config, json: bool) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = Arc::new(LocalStore::open(&data_dir));

        let gateway = Gateway::new(config.api_url.as_str(), store.clone())?
            .with_refresher(Arc::new(StoredCredentialsRefresher));
        let gateway = Arc::new(gateway);

        let cache = Arc::new(CowCache::new(store));
        let auth = AuthService::new(gateway.clone());
        let herd = Herd::new(ApiClient::new(gateway), cache);

        info!(api_url = %config.api_url, data_dir = %data_dir.display(), "{} ready", config.app_name);

        Ok(Self {
            config,
            auth,
            herd,
            json,
        })
    }

    fn require_login(&self) -> Result<()> {
        if !self.auth.is_authenticated() {
            bail!("Not logged in. Run `vacapp login` first.");
        }
        Ok(())
    }

    fn require_permission(&self, permission: Permission) -> Result<()> {
        self.require_login()?;
        if !self.auth.has_permission(permission) {
            bail!("Permission denied: {}", permission);
        }
        Ok(())
    }

    pub async fn login(&mut self, username: Option<String>, password: Option<String>) -> Result<()> {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(u) => u,
            None => prompt_username()?,
        };
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password("Password: ")?,
        };

        if username.is_empty() || password.is_empty() {
            bail!("Username and password required");
        }

        let user = self.auth.login(&username, &password).await?;

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!(
            "Logged in as {} ({}) - {}",
            user.username,
            user.role.as_deref().unwrap_or("sin rol"),
            user.ranch_name
        );
        Ok(())
    }

    pub fn logout(&self) {
        self.auth.logout();
        println!("Logged out");
    }

    pub fn whoami(&self) -> Result<()> {
        let Some(user) = self.auth.current_user() else {
            bail!("Not logged in");
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&user)?);
            return Ok(());
        }

        println!("User:    {}", user.username);
        println!("Role:    {}", user.role.as_deref().unwrap_or("-"));
        println!("Ranch:   {}", user.ranch_name);
        if let Some(ref owner) = user.owner {
            println!("Owner:   {}", owner);
        }
        let granted: Vec<&str> = Permission::ALL
            .iter()
            .filter(|p| user.has_permission(**p))
            .map(Permission::name)
            .collect();
        println!("Allowed: {}", granted.join(", "));

        if let Some(claims) = self.auth.token_claims() {
            if let Some(issued) = claims.issued_at() {
                println!("Issued:  {}", issued.format("%Y-%m-%d %H:%M"));
            }
            if let Some(expires) = claims.expires_at() {
                println!("Expires: {}", expires.format("%Y-%m-%d %H:%M"));
            }
            if claims.is_expired() {
                warn!("Session token has expired; it will be renewed on the next request");
                println!("Token expired, renewed on the next request");
            }
        }
        Ok(())
    }

    pub fn can(&self, permission: Permission) -> Result<()> {
        self.require_permission(permission)?;
        println!("Allowed: {}", permission);
        Ok(())
    }

    /// The dashboard: every cow with its owner and health.
    pub async fn list(&self) -> Result<()> {
        self.require_login()?;
        let dashboard = self.herd.dashboard().await?;

        let cards = join_all(dashboard.cows.iter().map(|cow| self.herd.cow_card(cow))).await;

        if self.json {
            let records: Vec<&CowRecord> = cards.iter().filter_map(|c| c.as_ref().ok()).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        println!(
            "{:>5}  {:>7}  {:<name$}  {:<owner$}  {}",
            "ID",
            "Arete",
            "Nombre",
            "Propietario",
            "Salud",
            name = NAME_WIDTH,
            owner = OWNER_WIDTH
        );
        for (cow, card) in dashboard.cows.iter().zip(cards) {
            let (owner, health) = match card {
                Ok(record) => (record.owner.clone(), record.health().to_string()),
                Err(e) => {
                    warn!(cow_id = cow.id, error = %e, "Failed to load cow card");
                    ("-".to_string(), "Error".to_string())
                }
            };
            println!(
                "{:>5}  {:>7}  {:<name$}  {:<owner$}  {}",
                cow.id,
                cow.ear_tag,
                truncate_string(&cow.display_name(), NAME_WIDTH),
                truncate_string(&owner, OWNER_WIDTH),
                health,
                name = NAME_WIDTH,
                owner = OWNER_WIDTH
            );
        }

        println!();
        println!("{} cows, {}", dashboard.cows.len(), last_update(dashboard.fetched_at));
        Ok(())
    }

    pub async fn show(&self, id: i64, refresh: bool) -> Result<()> {
        self.require_login()?;
        let record = self.herd.cow_details(id, refresh).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }

        print_cow(&record.cow);
        println!("Owner:       {}", record.owner);
        println!("Health:      {}", record.health());

        println!();
        println!("Diseases ({})", record.diseases.len());
        for d in &record.diseases {
            println!(
                "  [{}] {} - {} {}",
                d.record_id(),
                d.names(),
                d.disease_state().label(),
                d.diagnosed_on.as_deref().map(format_date).unwrap_or_default()
            );
        }

        println!();
        println!("Vaccinations ({})", record.vaccinations.len());
        for v in &record.vaccinations {
            let expires = v
                .expires_on
                .as_deref()
                .map(|e| format!(", expires {}", format_date(e)))
                .unwrap_or_default();
            println!(
                "  [{}] {} - applied {}{}",
                v.id,
                v.vaccine_name,
                format_date(&v.applied_on),
                expires
            );
        }

        println!();
        println!("Updated {}", record.age_display());
        Ok(())
    }

    pub async fn refresh(&self) -> Result<()> {
        self.require_login()?;
        let cached = self.herd.cache().cached_cow_ids();
        let dashboard = self.herd.refresh(&cached).await?;
        println!(
            "Refreshed: {} cows, {} brands",
            dashboard.cows.len(),
            self.herd.owners().all_owners().len()
        );
        Ok(())
    }

    pub async fn brands(&self) -> Result<()> {
        self.require_login()?;
        if self.herd.owners().all_owners().is_empty() {
            self.herd.owners().preload_all().await?;
        }

        let brands = self.herd.owners().all_owners();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&brands)?);
            return Ok(());
        }
        for brand in brands {
            println!("{:>5}  {}", brand.id, brand.owner_label().unwrap_or("-"));
        }
        Ok(())
    }

    pub async fn catalog(&self, vaccines: bool) -> Result<()> {
        self.require_login()?;
        let api = self.herd.api();
        let entries = if vaccines {
            api.fetch_vaccine_catalog().await?
        } else {
            api.fetch_disease_catalog().await?
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        for entry in entries {
            println!("{:>5}  {}", entry.id, entry.name);
        }
        Ok(())
    }

    pub async fn delete_diseases(&self, cow_id: i64, ids: &[i64]) -> Result<()> {
        self.require_permission(Permission::DeleteDiseases)?;
        let record = self.herd.delete_diseases(cow_id, ids).await?;
        println!("Deleted {} disease record(s)", ids.len());
        if let Some(record) = record {
            println!("Health now: {}", record.health());
        }
        Ok(())
    }

    pub async fn delete_vaccinations(&self, cow_id: i64, ids: &[i64]) -> Result<()> {
        self.require_permission(Permission::DeleteVaccinations)?;
        self.herd.delete_vaccinations(cow_id, ids).await?;
        println!("Deleted {} vaccination record(s)", ids.len());
        Ok(())
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn print_cow(cow: &Cow) {
    println!("{} (ID {})", cow.display_name(), cow.id);
    println!("Ear tag:     {}", cow.ear_tag);
    if let Some(ref birth) = cow.birth_date {
        println!(
            "Born:        {} ({})",
            format_date(birth),
            cow.age_display().unwrap_or_default()
        );
    }
    if let Some(ref color) = cow.color {
        println!("Color:       {}", color);
    }
    if let Some(calvings) = cow.calvings {
        println!("Calvings:    {}", calvings);
    }
    if let Some(ref last) = cow.last_calving {
        println!("Last calved: {}", format_date(last));
    }
    if let Some(ref description) = cow.description {
        println!("Notes:       {}", description);
    }
}

fn last_update(fetched_at: Option<i64>) -> String {
    let minutes = fetched_at
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|at| (chrono::Utc::now() - at).num_minutes());
    match minutes {
        Some(m) => format!("updated {}", vacapp_core::utils::format_age_minutes(m)),
        None => "never updated".to_string(),
    }
}
