use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagebloom::{
    api::ApiClient,
    handlers::{
        applications::{submit_application, ApplicationsPage},
        interviews::InterviewPanel,
        notifications::NotificationCenter,
    },
    middleware::auth::FileTokenStore,
    models::{demande::DemandeStatus, interview::InterviewMode, testimonial::NewTestimonial},
    services::{
        application_wizard::{ApplicationWizard, OfferSelection, WizardStep},
        file_validation::Attachment,
        interview_workflow::ProposalForm,
        notification::{Notifier, Toast, ToastVariant, TracingNotifier},
    },
    utils::{
        config::Config,
        errors::{AppError, ErrorCategory},
        jwt::read_claims,
    },
};

#[derive(Parser, Debug)]
#[command(name = "stagebloom", author, version, about = "StageBloom internship platform client")]
struct Cli {
    /// Overrides STAGEBLOOM_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Send confirmations to the log instead of the terminal
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the tokens locally
    Login {
        email: String,
        #[arg(long, env = "STAGEBLOOM_PASSWORD")]
        password: String,
    },
    Logout,
    Whoami,
    #[command(subcommand)]
    Demandes(DemandeCommand),
    /// Published internship offers
    Offres {
        #[arg(long)]
        search: Option<String>,
    },
    #[command(subcommand)]
    Interviews(InterviewCommand),
    #[command(subcommand)]
    Notifications(NotificationCommand),
    #[command(subcommand)]
    Testimonials(TestimonialCommand),
    /// RH dashboard counters
    Kpi,
    /// Admin table statistics
    DbStats,
}

#[derive(Subcommand, Debug)]
enum DemandeCommand {
    List {
        /// pending, interview_scheduled, interview_completed, approved or rejected
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        id: i64,
    },
    Approve {
        id: i64,
    },
    Reject {
        id: i64,
        #[arg(long)]
        raison: String,
    },
    /// Submit an application with its three PDF documents
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct SubmitArgs {
    #[arg(long)]
    nom: String,
    #[arg(long)]
    prenom: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    telephone: String,
    #[arg(long)]
    institut: String,
    #[arg(long)]
    specialite: String,
    #[arg(long)]
    niveau_etude: String,
    #[arg(long)]
    type_stage: String,
    #[arg(long)]
    date_debut: String,
    #[arg(long)]
    date_fin: String,
    #[arg(long)]
    cv: PathBuf,
    #[arg(long)]
    lettre_motivation: PathBuf,
    #[arg(long)]
    demande_stage: PathBuf,
    /// Offer to apply for; repeat for several
    #[arg(long = "offre")]
    offres: Vec<i64>,
    /// PFE subject reference, instead of offers
    #[arg(long, conflicts_with = "offres")]
    pfe_reference: Option<String>,
}

#[derive(Args, Debug)]
struct SlotArgs {
    #[arg(long)]
    date: String,
    #[arg(long)]
    time: String,
    /// presentiel or en_ligne
    #[arg(long, default_value = "presentiel")]
    mode: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long)]
    meeting_link: Option<String>,
}

impl SlotArgs {
    fn form(&self) -> anyhow::Result<ProposalForm> {
        let mode = match self.mode.to_lowercase().as_str() {
            "presentiel" | "onsite" => InterviewMode::Presentiel,
            "en_ligne" | "online" => InterviewMode::EnLigne,
            other => anyhow::bail!("Unknown interview mode '{}'", other),
        };
        Ok(ProposalForm {
            date: self.date.clone(),
            time: self.time.clone(),
            mode,
            location: self.location.clone(),
            meeting_link: self.meeting_link.clone(),
        })
    }
}

#[derive(Subcommand, Debug)]
enum InterviewCommand {
    /// Interviews of the current applications
    List {
        /// Only those waiting on me
        #[arg(long)]
        mine: bool,
    },
    /// RH: schedule an interview
    Propose {
        #[arg(long)]
        demande: i64,
        #[arg(long)]
        tuteur: i64,
        #[arg(long)]
        filiale: Option<i64>,
        #[command(flatten)]
        slot: SlotArgs,
    },
    /// Tutor: accept the proposed slot
    Accept {
        id: i64,
    },
    /// Tutor: suggest another slot
    Counter {
        id: i64,
        #[arg(long, default_value = "")]
        date: String,
        #[arg(long, default_value = "")]
        time: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// RH: accept or reject the tutor's suggestion
    Respond {
        id: i64,
        #[arg(value_parser = ["accept", "reject"])]
        decision: String,
    },
    /// RH: send a new slot instead of the tutor's suggestion
    Repropose {
        id: i64,
        #[command(flatten)]
        slot: SlotArgs,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    List {
        #[arg(long)]
        unread: bool,
    },
    Read {
        id: i64,
    },
    ReadAll,
}

#[derive(Subcommand, Debug)]
enum TestimonialCommand {
    List,
    Create {
        #[arg(long)]
        contenu: String,
        #[arg(long)]
        note: u8,
        #[arg(long)]
        poste: Option<String>,
    },
}

/// Prints toasts to the terminal.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Default => println!("✔ {}: {}", toast.title, toast.description),
            ToastVariant::Destructive => eprintln!("✘ {}: {}", toast.title, toast.description),
        }
    }
}

/// A handler error that has already been shown as a toast.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct Reported(#[from] AppError);

/// What to show for a failed command, if it was not shown already.
fn failure_message(err: &anyhow::Error) -> Option<String> {
    if err.is::<Reported>() {
        return None;
    }
    match err.downcast_ref::<AppError>() {
        Some(app) => Some(app.user_message()),
        None => Some(format!("{:#}", err)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagebloom=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let notifier: Arc<dyn Notifier> = if cli.quiet {
        Arc::new(TracingNotifier)
    } else {
        Arc::new(ConsoleNotifier)
    };

    match run(cli, notifier.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(message) = failure_message(&err) {
                notifier.notify(Toast::error("Erreur", message));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(api_url) = cli.api_url {
        config = config.with_api_url(api_url);
    }
    tracing::debug!("Using API at {}", config.api_url);

    let tokens = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let client = ApiClient::new(&config, tokens)?;

    match cli.command {
        Command::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            println!("Connecté en tant que {} ({})", user.full_name(), user.role);
        }
        Command::Logout => {
            client.logout()?;
            println!("Déconnecté");
        }
        Command::Whoami => match client.current_user() {
            Some(user) => {
                println!("Utilisateur #{} ({})", user.user_id, user.role_str());
                let claims = client
                    .token_store()
                    .load()
                    .and_then(|tokens| read_claims(&tokens.access).ok());
                if let Some(claims) = claims {
                    let state = if claims.is_expired(Utc::now()) { "expiré" } else { "valide" };
                    match claims.expires_at() {
                        Some(at) => println!("Jeton d'accès {} (expiration {})", state, at.format("%Y-%m-%d %H:%M UTC")),
                        None => println!("Jeton d'accès {}", state),
                    }
                }
            }
            None => println!("Non connecté"),
        },
        Command::Demandes(command) => demandes(&client, notifier, &config, command).await?,
        Command::Offres { search } => {
            let offres = client.list_offres().await?;
            for offre in offres
                .iter()
                .filter(|o| o.is_active)
                .filter(|o| search.as_deref().map_or(true, |q| o.matches(q)))
            {
                println!(
                    "#{:<4} {:<10} {}{}",
                    offre.id,
                    offre.reference.as_deref().unwrap_or("-"),
                    offre.titre,
                    if offre.is_pfe() { " [PFE]" } else { "" }
                );
            }
        }
        Command::Interviews(command) => interviews(client, notifier, command).await?,
        Command::Notifications(command) => {
            let mut center = NotificationCenter::new(client, notifier);
            match command {
                NotificationCommand::List { unread } => {
                    center.refresh().await.map_err(Reported)?;
                    println!("{} non lue(s)", center.unread_count());
                    for n in center.notifications.iter().filter(|n| !unread || !n.is_read) {
                        let marker = if n.is_read { " " } else { "•" };
                        println!("{} #{:<4} {}: {}", marker, n.id, n.titre, n.message);
                    }
                }
                NotificationCommand::Read { id } => center.mark_read(id).await.map_err(Reported)?,
                NotificationCommand::ReadAll => {
                    center.refresh().await.map_err(Reported)?;
                    let count = center.mark_all_read().await.map_err(Reported)?;
                    println!("{} notification(s) marquée(s) comme lue(s)", count);
                }
            }
        }
        Command::Testimonials(TestimonialCommand::List) => {
            for t in client.list_testimonials().await? {
                println!("{} ({}/5): {}", t.auteur, t.note, t.contenu);
            }
        }
        Command::Testimonials(TestimonialCommand::Create { contenu, note, poste }) => {
            let created = client
                .create_testimonial(&NewTestimonial { contenu, note, poste })
                .await?;
            notifier.notify(Toast::success(
                "Merci !",
                format!("Témoignage #{} envoyé pour modération", created.id),
            ));
        }
        Command::Kpi => {
            let kpi = client.rh_kpi_globaux().await?;
            println!("Demandes: {}", kpi.total_demandes);
            println!("  en attente: {}", kpi.demandes_en_attente);
            println!("  acceptées:  {}", kpi.demandes_acceptees);
            println!("  refusées:   {}", kpi.demandes_refusees);
            println!("Entretiens planifiés: {}", kpi.entretiens_planifies);
            println!("Offres actives: {}", kpi.offres_actives);
            if let Some(rate) = kpi.taux_acceptation() {
                println!("Taux d'acceptation: {:.1}%", rate);
            }
            for (key, value) in &kpi.extra {
                println!("{}: {}", key, value);
            }
        }
        Command::DbStats => {
            let stats = client.admin_database_stats().await?;
            for (table, rows) in &stats.tables {
                println!("{:<32} {:>8}", table, rows);
            }
            println!("{:<32} {:>8}", "total", stats.total_rows());
            if let Some(size) = &stats.database_size {
                println!("Taille: {}", size);
            }
        }
    }

    Ok(())
}

async fn demandes(
    client: &ApiClient,
    notifier: Arc<dyn Notifier>,
    config: &Config,
    command: DemandeCommand,
) -> anyhow::Result<()> {
    match command {
        DemandeCommand::List { status } => {
            let mut page = ApplicationsPage::new(client.clone(), notifier);
            page.refresh().await.map_err(Reported)?;
            let listed = match status {
                Some(raw) => {
                    let status: DemandeStatus = serde_json::from_value(serde_json::Value::from(raw))?;
                    page.by_status(status)
                }
                None => page.demandes.iter().collect(),
            };
            for d in listed {
                println!("#{:<4} {:<28} {:<20} {}", d.id, d.full_name(), d.status.label(), d.email);
                if let Some(binome) = d.binome_name() {
                    println!("      binôme: {}", binome);
                }
            }
        }
        DemandeCommand::Show { id } => {
            let demande = client.get_demande(id).await?;
            println!("{}", serde_json::to_string_pretty(&demande)?);
        }
        DemandeCommand::Approve { id } => {
            ApplicationsPage::new(client.clone(), notifier)
                .approve(id)
                .await
                .map_err(Reported)?;
        }
        DemandeCommand::Reject { id, raison } => {
            ApplicationsPage::new(client.clone(), notifier)
                .reject(id, &raison)
                .await
                .map_err(Reported)?;
        }
        DemandeCommand::Submit(args) => {
            let mut wizard = ApplicationWizard::new(config.max_upload_bytes);
            let form = &mut wizard.form;
            form.personal.nom = args.nom;
            form.personal.prenom = args.prenom;
            form.personal.email = args.email;
            form.personal.telephone = args.telephone;
            form.academic.institut = args.institut;
            form.academic.specialite = args.specialite;
            form.academic.niveau_etude = args.niveau_etude;
            form.academic.type_stage = args.type_stage;
            form.academic.date_debut = args.date_debut;
            form.academic.date_fin = args.date_fin;
            form.documents.cv = Some(read_attachment(&args.cv).await?);
            form.documents.lettre_motivation = Some(read_attachment(&args.lettre_motivation).await?);
            form.documents.demande_stage = Some(read_attachment(&args.demande_stage).await?);
            form.selection = match args.pfe_reference {
                Some(reference) => OfferSelection::Pfe { reference },
                None => OfferSelection::Offres(args.offres),
            };

            let demande = match submit_application(client, notifier.as_ref(), &mut wizard).await {
                Ok(demande) => demande,
                Err(err) => {
                    if matches!(err.category(), ErrorCategory::Validation | ErrorCategory::File) {
                        let step = wizard.step();
                        eprintln!("  étape {}/{}: {}", step.number(), WizardStep::ALL.len(), step.title());
                    }
                    return Err(Reported(err).into());
                }
            };
            println!("Demande #{} créée ({})", demande.id, demande.status.label());
        }
    }
    Ok(())
}

async fn read_attachment(path: &std::path::Path) -> anyhow::Result<Attachment> {
    Attachment::from_path(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))
}

async fn interviews(
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    command: InterviewCommand,
) -> anyhow::Result<()> {
    let mut panel = InterviewPanel::for_current_user(client, notifier)?;
    panel.refresh().await.map_err(Reported)?;

    match command {
        InterviewCommand::List { mine } => {
            let listed: Vec<_> = if mine {
                panel.awaiting_me()
            } else {
                panel
                    .demandes
                    .iter()
                    .flat_map(|d| d.interview_requests.iter())
                    .collect()
            };
            for i in listed {
                let waiting_on = if i.is_awaiting_tutor() {
                    "tuteur"
                } else if i.is_awaiting_rh() {
                    "RH"
                } else {
                    "-"
                };
                println!(
                    "#{:<4} demande #{:<4} {} {} {:<22} attente: {}",
                    i.id,
                    i.demande,
                    i.proposed_date,
                    i.proposed_time.format("%H:%M"),
                    i.status.label(),
                    waiting_on
                );
                if let Some(suggestion) = i.suggestion() {
                    println!(
                        "      suggestion: {} {} {}",
                        suggestion.date,
                        suggestion.time.format("%H:%M"),
                        suggestion.comment.as_deref().unwrap_or("")
                    );
                }
            }
        }
        InterviewCommand::Propose {
            demande,
            tuteur,
            filiale,
            slot,
        } => {
            let created = panel
                .schedule(demande, tuteur, filiale, &slot.form()?)
                .await
                .map_err(Reported)?;
            println!("Entretien #{} proposé", created.id);
        }
        InterviewCommand::Accept { id } => {
            panel.open(id)?;
            panel.accept().await.map_err(Reported)?;
        }
        InterviewCommand::Counter {
            id,
            date,
            time,
            comment,
        } => {
            let modal = panel.open(id)?;
            modal.suggested_date = date;
            modal.suggested_time = time;
            modal.comment = comment;
            panel.propose_new_time().await.map_err(Reported)?;
        }
        InterviewCommand::Respond { id, decision } => {
            panel.open(id)?;
            if decision == "accept" {
                panel.accept_suggestion().await.map_err(Reported)?;
            } else {
                panel.reject_suggestion().await.map_err(Reported)?;
            }
        }
        InterviewCommand::Repropose { id, slot } => {
            panel.open(id)?;
            panel.repropose(&slot.form()?).await.map_err(Reported)?;
        }
    }
    Ok(())
}
