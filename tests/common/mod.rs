//! In-process stand-in for the StageBloom backend.
#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use stagebloom::{
    api::ApiClient,
    middleware::auth::{AuthTokens, MemoryTokenStore},
    models::{
        demande::Demande,
        interview::{CounterProposal, InterviewRequest, Proposal, Venue},
        parse_date, parse_time,
        user::{User, UserRole},
    },
    services::interview_workflow::{InterviewAction, SideEffect},
    utils::config::Config,
};

pub const REFRESH_TOKEN: &str = "refresh-1";
pub const REFRESHED_ACCESS: &str = "access-refreshed";

/// A captured multipart part: field name, file name, text value.
#[derive(Debug, Clone)]
pub struct CapturedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub text: Option<String>,
}

pub struct MockState {
    valid_access: Mutex<String>,
    pub refresh_ok: AtomicBool,
    pub always_unauthorized: AtomicBool,
    hits: Mutex<HashMap<&'static str, usize>>,
    pub demandes: Mutex<Vec<Demande>>,
    pub parts: Mutex<Vec<CapturedPart>>,
}

impl MockState {
    pub fn new(valid_access: &str) -> Self {
        Self {
            valid_access: Mutex::new(valid_access.to_string()),
            refresh_ok: AtomicBool::new(true),
            always_unauthorized: AtomicBool::new(false),
            hits: Mutex::new(HashMap::new()),
            demandes: Mutex::new(Vec::new()),
            parts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_demandes(self, demandes: Vec<Demande>) -> Self {
        *self.demandes.lock().unwrap() = demandes;
        self
    }

    pub fn hits(&self, endpoint: &str) -> usize {
        self.hits.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    fn hit(&self, endpoint: &'static str) {
        *self.hits.lock().unwrap().entry(endpoint).or_default() += 1;
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        if self.always_unauthorized.load(Ordering::SeqCst) || presented != Some(expected.as_str()) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Given token not valid for any token type"})),
            )
                .into_response());
        }
        Ok(())
    }

    fn apply(&self, interview_id: i64, role: UserRole, action: &InterviewAction) -> Response {
        let mut demandes = self.demandes.lock().unwrap();
        for demande in demandes.iter_mut() {
            let Some(interview) = demande
                .interview_requests
                .iter_mut()
                .find(|i| i.id == interview_id)
            else {
                continue;
            };

            return match interview.apply(role, action) {
                Ok(effects) => {
                    let status = interview.status;
                    for effect in effects {
                        if let SideEffect::AdvanceDemande(next) = effect {
                            demande.status = next;
                        }
                    }
                    (StatusCode::OK, Json(json!({"status": status}))).into_response()
                }
                Err(err) => {
                    (StatusCode::BAD_REQUEST, Json(json!({"detail": err.to_string()}))).into_response()
                }
            };
        }
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Entretien introuvable"}))).into_response()
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/api/auth/login/", post(login))
            .route("/api/auth/refresh/", post(refresh))
            .route("/api/demandes/", get(list_demandes))
            .route("/api/demandes/create/", post(create_demande))
            .route("/api/interviews/propose/", post(propose))
            .route("/api/interviews/:id/tuteur-respond/", post(tuteur_respond))
            .route("/api/interviews/:id/proposal-response/", post(proposal_response))
            .route("/api/notifications/", get(list_notifications))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api", addr),
            state,
        }
    }

    pub fn client(&self, tokens: Option<AuthTokens>) -> ApiClient {
        let store = match tokens {
            Some(tokens) => MemoryTokenStore::with_tokens(tokens),
            None => MemoryTokenStore::new(),
        };
        let config = Config::default().with_api_url(self.base_url.clone());
        ApiClient::new(&config, Arc::new(store)).unwrap()
    }

    pub fn client_as(&self, access: &str, role: UserRole) -> ApiClient {
        self.client(Some(tokens(access, role)))
    }
}

pub fn user(role: UserRole) -> User {
    User {
        id: match role {
            UserRole::Candidat => 1,
            UserRole::Rh => 2,
            UserRole::Tuteur => 5,
            UserRole::Admin => 9,
        },
        email: format!("{}@stagebloom.tn", role),
        first_name: "Test".to_string(),
        last_name: role.as_str().to_uppercase(),
        role,
    }
}

pub fn tokens(access: &str, role: UserRole) -> AuthTokens {
    AuthTokens {
        access: access.to_string(),
        refresh: Some(REFRESH_TOKEN.to_string()),
        user: Some(user(role)),
    }
}

/// An application with one interview in the given status.
pub fn demande_with_interview(id: i64, interview_id: i64, status: &str) -> Demande {
    let mut interview = json!({
        "id": interview_id,
        "demande": id,
        "tuteur": 5,
        "status": status,
        "proposed_date": "2026-11-04",
        "proposed_time": "09:00:00",
        "mode": "presentiel",
        "location": "Siège, Les Berges du Lac"
    });
    if status == "REVISION_REQUESTED" {
        interview["suggested_date"] = json!("2026-11-06");
        interview["suggested_time"] = json!("14:30:00");
        interview["tuteur_comment"] = json!("Indisponible le matin");
    }

    serde_json::from_value(json!({
        "id": id,
        "nom": "Haddad",
        "prenom": "Yasmine",
        "email": "yasmine.haddad@etudiant.tn",
        "status": "pending",
        "offer_ids": [3],
        "interview_requests": [interview]
    }))
    .unwrap()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit("login");
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }

    let access = state.valid_access.lock().unwrap().clone();
    Json(json!({
        "access": access,
        "refresh": REFRESH_TOKEN,
        "user": user(UserRole::Rh)
    }))
    .into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.hit("refresh");
    if !state.refresh_ok.load(Ordering::SeqCst) || body["refresh"] != REFRESH_TOKEN {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        )
            .into_response();
    }

    *state.valid_access.lock().unwrap() = REFRESHED_ACCESS.to_string();
    Json(json!({"access": REFRESHED_ACCESS})).into_response()
}

async fn list_demandes(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("demandes");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let demandes = state.demandes.lock().unwrap().clone();
    Json(json!(demandes)).into_response()
}

async fn create_demande(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.hit("create");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }

    let mut captured = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let text = if file_name.is_none() {
            Some(field.text().await.unwrap())
        } else {
            field.bytes().await.unwrap();
            None
        };
        captured.push(CapturedPart {
            name,
            file_name,
            text,
        });
    }

    let value_of = |key: &str| {
        captured
            .iter()
            .find(|p| p.name == key)
            .and_then(|p| p.text.clone())
            .unwrap_or_default()
    };
    let body = json!({
        "id": 99,
        "nom": value_of("nom"),
        "prenom": value_of("prenom"),
        "email": value_of("email"),
        "status": "pending"
    });
    *state.parts.lock().unwrap() = captured;

    (StatusCode::CREATED, Json(body)).into_response()
}

async fn tuteur_respond(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("tuteur-respond");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }

    let action = match body["action"].as_str() {
        Some("accept") => InterviewAction::Accept,
        Some("propose_new_time") => {
            let date = body["suggested_date"].as_str().and_then(parse_date);
            let time = body["suggested_time"].as_str().and_then(parse_time);
            match (date, time) {
                (Some(date), Some(time)) => InterviewAction::ProposeNewTime(CounterProposal {
                    date,
                    time,
                    comment: body["comment"].as_str().map(str::to_string),
                }),
                _ => return bad_request("suggested_date et suggested_time requis"),
            }
        }
        _ => return bad_request("action inconnue"),
    };

    state.apply(id, UserRole::Tuteur, &action)
}

async fn proposal_response(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("proposal-response");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }

    let action = match body["action"].as_str() {
        Some("accept") => InterviewAction::AcceptSuggestion,
        Some("reject") => InterviewAction::RejectSuggestion,
        Some("repropose") => match slot_from(&body) {
            Some(proposal) => InterviewAction::Repropose(proposal),
            None => return bad_request("créneau invalide"),
        },
        _ => return bad_request("action inconnue"),
    };

    state.apply(id, UserRole::Rh, &action)
}

async fn propose(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("propose");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }

    let (Some(demande_id), Some(proposal)) = (body["demande_id"].as_i64(), slot_from(&body)) else {
        return bad_request("demande_id et créneau requis");
    };

    let mut demandes = state.demandes.lock().unwrap();
    let next_id = demandes
        .iter()
        .flat_map(|d| d.interview_requests.iter())
        .map(|i| i.id)
        .max()
        .unwrap_or(0)
        + 1;
    let Some(demande) = demandes.iter_mut().find(|d| d.id == demande_id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Demande introuvable"}))).into_response();
    };

    let mut created = InterviewRequest::new(next_id, demande_id, body["tuteur_id"].as_i64(), &proposal);
    created.filiale = body["filiale_id"].as_i64();
    demande.interview_requests.push(created.clone());

    (StatusCode::CREATED, Json(json!(created))).into_response()
}

/// Reads `proposed_date`, `proposed_time`, `mode` and the venue field.
fn slot_from(body: &Value) -> Option<Proposal> {
    let date = body["proposed_date"].as_str().and_then(parse_date)?;
    let time = body["proposed_time"].as_str().and_then(parse_time)?;
    let venue = match body["mode"].as_str() {
        Some("en_ligne") => Venue::Online {
            meeting_link: body["meeting_link"].as_str()?.to_string(),
        },
        _ => Venue::OnSite {
            location: body["location"].as_str()?.to_string(),
        },
    };
    Some(Proposal { date, time, venue })
}

async fn list_notifications(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.hit("notifications");
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    Json(json!({
        "count": 2,
        "results": [
            {"id": 1, "titre": "Entretien", "message": "Nouvelle date proposée", "type": "interview", "is_read": false},
            {"id": 2, "titre": "Demande", "message": "Demande reçue", "is_read": true}
        ]
    }))
    .into_response()
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"detail": detail}))).into_response()
}
