#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use handlebars::Handlebars;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::aggregate::{group_counts, kpi_pair, percentage_pair};
use crate::config::Config;
use crate::downloader;
use crate::error::{Error, Result};
use crate::graph::{self, ChartOptions};
use crate::loader;
use crate::record::{AssetRecord, GroupKey};
use crate::session::{SESSION_COOKIE, Session, SessionStore};
use crate::table::{RowFilter, Selection};
use crate::view::{
    DistributionView, FilterOption, HomeFilter, HomeSummary, HomeView, Page, distribution_view,
    home_view,
};

const SITE_TITLE: &str = "Asset Dashboard";
const NEWS_HEADING: &str = "Distribusi Aset PT.PLN UP3 Surabaya Barat";
const UPLOAD_PROMPT: &str = "Upload a file";
const UPLOAD_FIELD: &str = "file";

pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string("dashboard", include_str!("../templates/dashboard.hbs"))
            .map_err(|e| Error::Generic(e.to_string()))?;

        Ok(AppState {
            sessions: SessionStore::new(config.session_ttl),
            config,
            templates,
        })
    }

    fn session(&self, jar: &CookieJar) -> Option<Session> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| self.sessions.get(cookie.value()))
    }

    fn require_session(&self, jar: &CookieJar) -> Result<Session> {
        self.session(jar)
            .ok_or_else(|| Error::NoData(UPLOAD_PROMPT.to_string()))
    }

    fn render(&self, context: &PageContext) -> Result<Html<String>> {
        Ok(Html(self.templates.render("dashboard", context)?))
    }
}

/// Filter selections as they arrive in the query string
///
/// Multi-selects repeat their key (`status=A&status=B`). Selections only apply
/// once the filter form has been submitted (`applied=1`); before that the
/// default Home selection applies.
#[derive(Deserialize, Debug, Default)]
pub struct DashboardQuery {
    page: Option<String>,
    #[serde(default)]
    status: Vec<String>,
    #[serde(default)]
    month: Vec<String>,
    #[serde(default)]
    bulan: Vec<String>,
    asset: Option<String>,
    applied: Option<String>,
}

impl DashboardQuery {
    fn home_filter(&self) -> HomeFilter {
        let asset = self.asset().map(str::to_string);
        if self.applied.is_none() {
            return HomeFilter {
                asset,
                ..Default::default()
            };
        }

        HomeFilter {
            status: Selection::Only(self.status.clone()),
            changed_month: Selection::Only(self.month.clone()),
            bulan: Selection::Only(self.bulan.clone()),
            asset,
        }
    }

    fn asset(&self) -> Option<&str> {
        self.asset.as_deref().filter(|asset| !asset.is_empty())
    }

    fn single_bulan(&self) -> Option<&str> {
        self.bulan.first().map(String::as_str)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::UnsupportedFileType(_)
            | Error::MissingExtension
            | Error::EmptyWorkbook
            | Error::Calamine(_)
            | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NoData(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Context handed to the dashboard template
#[derive(Serialize, Default)]
struct PageContext {
    site_title: &'static str,
    heading: String,
    is_home: bool,
    is_news: bool,
    file_name: Option<String>,
    info: Option<String>,
    error: Option<String>,
    warnings: Vec<String>,
    home: Option<HomeContext>,
    news: Option<NewsContext>,
}

#[derive(Serialize)]
struct HomeContext {
    status_options: Vec<FilterOption>,
    month_options: Vec<FilterOption>,
    bulan_options: Vec<FilterOption>,
    summary: Option<HomeSummary>,
    class_chart_url: Option<String>,
    asset_options: Vec<FilterOption>,
    selected_asset: Option<String>,
    monthly_chart_url: Option<String>,
    growth_chart_url: Option<String>,
    export_xlsx_url: String,
    export_csv_url: String,
}

#[derive(Serialize)]
struct NewsContext {
    bulan_options: Vec<FilterOption>,
    assets: Vec<AssetCard>,
}

#[derive(Serialize)]
struct AssetCard {
    asset: String,
    gap_heading: String,
    total_gap: String,
    percentage_chart_url: Option<String>,
    kpi_chart_url: Option<String>,
}

impl PageContext {
    fn new(page: Page) -> Self {
        PageContext {
            site_title: SITE_TITLE,
            heading: match page {
                Page::Home => SITE_TITLE.to_string(),
                Page::News => NEWS_HEADING.to_string(),
            },
            is_home: page == Page::Home,
            is_news: page == Page::News,
            ..Default::default()
        }
    }

    fn prompt(page: Page) -> Self {
        PageContext {
            info: Some(UPLOAD_PROMPT.to_string()),
            ..PageContext::new(page)
        }
    }
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Query string reproducing a Home filter built by [`DashboardQuery::home_filter`]
fn home_query(filter: &HomeFilter, asset: Option<&str>) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    let selections = [
        ("status", &filter.status),
        ("month", &filter.changed_month),
        ("bulan", &filter.bulan),
    ];
    if selections
        .iter()
        .any(|(_, selection)| matches!(selection, Selection::Only(_)))
    {
        pairs.push(("applied", "1"));
        for (key, selection) in selections {
            if let Selection::Only(values) = selection {
                pairs.extend(values.iter().map(|v| (key, v.as_str())));
            }
        }
    }
    if let Some(asset) = asset {
        pairs.push(("asset", asset));
    }
    encode_pairs(&pairs)
}

fn home_context(filter: &HomeFilter, view: HomeView) -> HomeContext {
    let query = home_query(filter, None);
    let asset_query = view
        .asset_panel
        .as_ref()
        .map(|panel| home_query(filter, Some(&panel.asset)));

    HomeContext {
        class_chart_url: view
            .summary
            .as_ref()
            .map(|_| format!("/chart/class-description.png?{}", query)),
        monthly_chart_url: asset_query
            .as_ref()
            .map(|q| format!("/chart/monthly.png?{}", q)),
        growth_chart_url: asset_query
            .as_ref()
            .map(|q| format!("/chart/growth.png?{}", q)),
        export_xlsx_url: format!("/export.xlsx?{}", query),
        export_csv_url: format!("/export.csv?{}", query),
        asset_options: view
            .asset_options
            .iter()
            .map(|asset| FilterOption {
                value: asset.clone(),
                selected: view.selected_asset.as_deref() == Some(asset.as_str()),
            })
            .collect(),
        status_options: view.status_options,
        month_options: view.month_options,
        bulan_options: view.bulan_options,
        summary: view.summary,
        selected_asset: view.selected_asset,
    }
}

fn news_context(view: DistributionView) -> NewsContext {
    let selected = view.selected_bulan.clone().unwrap_or_default();

    NewsContext {
        bulan_options: view
            .bulan_options
            .iter()
            .map(|bulan| FilterOption {
                value: bulan.clone(),
                selected: *bulan == selected,
            })
            .collect(),
        assets: view
            .assets
            .into_iter()
            .map(|breakdown| {
                let query = encode_pairs(&[("bulan", selected.as_str()), ("asset", breakdown.asset.as_str())]);
                AssetCard {
                    gap_heading: format!("Total GAP for Asset: {}", breakdown.asset),
                    total_gap: breakdown.total_gap.formatted,
                    percentage_chart_url: breakdown
                        .percentage
                        .map(|_| format!("/chart/percentage.png?{}", query)),
                    kpi_chart_url: breakdown
                        .kpi
                        .map(|_| format!("/chart/kpi.png?{}", query)),
                    asset: breakdown.asset,
                }
            })
            .collect(),
    }
}

fn missing_column_warning(session: &Session) -> Option<String> {
    if session.table.missing_columns.is_empty() {
        return None;
    }
    let names: Vec<&str> = session
        .table
        .missing_columns
        .iter()
        .map(|column| column.header())
        .collect();
    Some(format!("Columns not found in the workbook: {}", names.join(", ")))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>> {
    let page = Page::from_query(query.page.as_deref());
    let Some(session) = state.session(&jar) else {
        return state.render(&PageContext::prompt(page));
    };

    let mut context = PageContext::new(page);
    context.file_name = Some(session.file_name.clone());
    context.warnings.extend(missing_column_warning(&session));

    match page {
        Page::Home => {
            let filter = query.home_filter();
            let view = home_view(&session.table, &filter, state.config.report_year);
            context.warnings.extend(view.warnings.iter().cloned());
            context.home = Some(home_context(&filter, view));
        }
        Page::News => {
            let view = distribution_view(&session.table, query.single_bulan());
            context.news = Some(news_context(view));
        }
    }

    state.render(&context)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Error::InvalidInput(e.to_string()).into_response(),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
            Err(e) => return Error::InvalidInput(e.to_string()).into_response(),
        }
    }

    let Some((file_name, bytes)) = upload.filter(|(name, _)| !name.is_empty()) else {
        return Redirect::to("/").into_response();
    };

    let loaded = {
        let file_name = file_name.clone();
        tokio::task::spawn_blocking(move || loader::load_bytes(&file_name, bytes)).await
    };
    let table = match loaded {
        Ok(Ok(table)) => table,
        Ok(Err(e)) => {
            warn!("Rejected upload {}: {}", file_name, e);
            return upload_error(&state, e);
        }
        Err(e) => return Error::Generic(e.to_string()).into_response(),
    };

    info!("Uploaded {} with {} rows", file_name, table.len());

    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| state.sessions.get(id).is_some());
    let session_id = match existing {
        Some(id) => {
            state.sessions.replace(&id, &file_name, table);
            id
        }
        None => state.sessions.create(&file_name, table),
    };

    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
    cookie.set_path("/");
    cookie.set_http_only(true);

    (jar.add(cookie), Redirect::to("/")).into_response()
}

fn upload_error(state: &AppState, error: Error) -> Response {
    let message = match error {
        Error::UnsupportedFileType(_) | Error::MissingExtension => {
            "Unsupported file type".to_string()
        }
        other => format!("Failed to read the workbook: {}", other),
    };
    let context = PageContext {
        error: Some(message),
        ..PageContext::new(Page::Home)
    };

    match state.render(&context) {
        Ok(html) => (StatusCode::BAD_REQUEST, html).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn home_api(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<HomeView>> {
    let session = state.require_session(&jar)?;
    Ok(Json(home_view(
        &session.table,
        &query.home_filter(),
        state.config.report_year,
    )))
}

async fn distribution_api(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DistributionView>> {
    let session = state.require_session(&jar)?;
    Ok(Json(distribution_view(&session.table, query.single_bulan())))
}

fn png_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    )
        .into_response()
}

async fn class_description_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let rows = session.table.filter(&query.home_filter().summary_filter());
    let counts = group_counts(&rows, GroupKey::ClassDescription);

    let options = ChartOptions::titled("Count of Assets by Class Description");
    Ok(png_response(graph::class_description_chart(&counts, &options)?))
}

async fn monthly_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let view = home_view(&session.table, &query.home_filter(), state.config.report_year);
    let panel = view
        .asset_panel
        .ok_or_else(|| Error::NoData(view.warnings.join("; ")))?;

    let options = ChartOptions::titled(format!("MAXIMO and LTB for Asset: {}", panel.asset));
    Ok(png_response(graph::monthly_kpi_chart(
        &panel.months,
        &panel.monthly,
        &options,
    )?))
}

async fn growth_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let view = home_view(&session.table, &query.home_filter(), state.config.report_year);
    let panel = view
        .asset_panel
        .ok_or_else(|| Error::NoData(view.warnings.join("; ")))?;

    let options = ChartOptions::titled(format!(
        "Growth of MAXIMO and LTB for Asset: {}",
        panel.asset
    ));
    Ok(png_response(graph::growth_chart(&panel.growth, &options)?))
}

/// Rows of one asset in one BULAN, as shown on the "Distribusi Aset" page
fn asset_rows<'a>(session: &'a Session, query: &DashboardQuery) -> Result<(String, Vec<&'a AssetRecord>)> {
    let asset = query
        .asset()
        .ok_or_else(|| Error::InvalidInput("Missing asset".to_string()))?
        .to_string();
    let bulan = query
        .single_bulan()
        .ok_or_else(|| Error::InvalidInput("Missing bulan".to_string()))?;

    let rows = session.table.filter(&RowFilter {
        bulan: Selection::Only(vec![bulan.to_string()]),
        asset: Some(asset.clone()),
        ..Default::default()
    });
    if rows.is_empty() {
        return Err(Error::NoData(format!("No data available for asset: {}", asset)));
    }
    Ok((asset, rows))
}

async fn percentage_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let (asset, rows) = asset_rows(&session, &query)?;
    let pair = percentage_pair(&rows, &asset)
        .ok_or_else(|| Error::NoData(format!("No data available for asset: {}", asset)))?;

    let options = ChartOptions {
        title: format!("PERSEN and SISA PERSENTASE for Asset: {}", asset),
        width: 500,
        height: 400,
    };
    Ok(png_response(graph::percentage_chart(&pair, &options)?))
}

async fn kpi_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let (asset, rows) = asset_rows(&session, &query)?;
    let kpi = kpi_pair(&rows, &asset)
        .ok_or_else(|| Error::NoData(format!("No data available for asset: {}", asset)))?;

    let options = ChartOptions {
        title: format!("MAXIMO and LTB for Asset: {}", asset),
        width: 500,
        height: 400,
    };
    Ok(png_response(graph::kpi_chart(&kpi, &options)?))
}

/// Rows matching every Home selection, for the export links
fn export_rows<'a>(session: &'a Session, query: &DashboardQuery) -> Vec<&'a AssetRecord> {
    let filter = query.home_filter();
    session.table.filter(&RowFilter {
        status: filter.status,
        changed_month: filter.changed_month,
        bulan: filter.bulan,
        asset: None,
    })
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let bytes = downloader::to_xlsx(&export_rows(&session, &query))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"aset_filtered.xlsx\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let session = state.require_session(&jar)?;
    let csv = downloader::to_csv(&export_rows(&session, &query));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"aset_filtered.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/home", get(home_api))
        .route("/distribution", get(distribution_api))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", get(dashboard))
        .route("/upload", post(upload))
        .route("/chart/class-description.png", get(class_description_chart))
        .route("/chart/monthly.png", get(monthly_chart))
        .route("/chart/growth.png", get(growth_chart))
        .route("/chart/percentage.png", get(percentage_chart))
        .route("/chart/kpi.png", get(kpi_chart))
        .route("/export.xlsx", get(export_xlsx))
        .route("/export.csv", get(export_csv))
        .nest("/api", api)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state)
}

pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let address = config.bind_address();
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    // Start server
    let listener = TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_without_applied_uses_default_selection() {
        let query = DashboardQuery {
            status: vec!["BROKEN".into()],
            ..Default::default()
        };
        assert_eq!(query.home_filter(), HomeFilter::default());
    }

    #[test]
    fn applied_query_restricts_every_field() {
        let query = DashboardQuery {
            status: vec!["BROKEN".into()],
            applied: Some("1".into()),
            asset: Some(String::new()),
            ..Default::default()
        };
        let filter = query.home_filter();
        assert_eq!(filter.status, Selection::Only(vec!["BROKEN".into()]));
        assert_eq!(filter.bulan, Selection::Only(vec![]));
        assert_eq!(filter.asset, None);
    }

    #[test]
    fn home_query_round_trips_selections() {
        let filter = HomeFilter {
            status: Selection::Only(vec!["IN SERVICE".into()]),
            ..Default::default()
        };
        assert_eq!(
            home_query(&filter, Some("Trafo 1")),
            "applied=1&status=IN%20SERVICE&asset=Trafo%201"
        );
        assert_eq!(home_query(&HomeFilter::default(), None), "");
    }

    #[test]
    fn errors_map_to_status_codes() {
        let response = Error::UnsupportedFileType("csv".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = Error::NoData("nothing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = Error::Chart("font".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
