use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    Allocation, AllocationError, AssetTemplate, BaseWeight, ImplementationPlan, Inputs,
    MarketAnalysis, PortfolioReport, PortfolioResult, Projection, RiskProfile, Strategy,
    build_portfolio, three_bucket_base, validate_inputs,
};
use crate::market::{
    Collaborators, DEFAULT_MARKET_SYMBOL, DEFAULT_MAX_NEW_TOKENS, DEFAULT_YAHOO_BASE_URL,
    Enrichment, HttpNarrative, MarketError, YahooChartSource,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliStrategy {
    ThreeBucket,
    RiskParity,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStrategy {
    #[serde(alias = "threeBucket", alias = "three_bucket")]
    ThreeBucket,
    #[serde(
        alias = "riskParity",
        alias = "risk_parity",
        alias = "all-weather",
        alias = "allWeather"
    )]
    RiskParity,
}

impl From<ApiStrategy> for CliStrategy {
    fn from(value: ApiStrategy) -> Self {
        match value {
            ApiStrategy::ThreeBucket => CliStrategy::ThreeBucket,
            ApiStrategy::RiskParity => CliStrategy::RiskParity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemplateWeightPayload {
    asset: String,
    weight: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PortfolioPayload {
    age: Option<i64>,
    #[serde(alias = "risk")]
    risk_tolerance: Option<String>,
    monthly_investment: Option<f64>,
    strategy: Option<ApiStrategy>,
    template_name: Option<String>,
    template: Option<Vec<TemplateWeightPayload>>,
}

#[derive(Parser, Debug)]
#[command(
    name = "allweather",
    about = "Age- and risk-adjusted portfolio allocation with a simple growth projection"
)]
pub struct Cli {
    #[arg(long, short, global = true, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web form and JSON API
    Serve(ServeArgs),
    /// Print a portfolio report for one set of inputs
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CollaboratorArgs {
    #[arg(long, help = "Fetch recent market data and add a market analysis section")]
    pub market_data: bool,
    #[arg(long, default_value = DEFAULT_MARKET_SYMBOL)]
    pub market_symbol: String,
    #[arg(long, default_value = DEFAULT_YAHOO_BASE_URL)]
    pub market_base_url: String,
    #[arg(long, help = "Text-generation endpoint for optional market commentary")]
    pub narrative_url: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    pub narrative_max_tokens: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PortfolioArgs {
    #[arg(long, help = "Investor age, 18 to 100")]
    pub age: u32,
    #[arg(long, help = "Risk tolerance: Low, Moderate or High")]
    pub risk: String,
    #[arg(long, help = "Amount invested every month")]
    pub monthly_investment: f64,
    #[arg(long, value_enum, default_value_t = CliStrategy::ThreeBucket)]
    pub strategy: CliStrategy,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub portfolio: PortfolioArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

#[derive(Clone)]
struct AppState {
    collaborators: Arc<Collaborators>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    age: u32,
    risk_profile: RiskProfile,
    monthly_investment: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioResponse {
    summary: SummaryResponse,
    strategy: &'static str,
    template_name: Option<String>,
    allocation: Allocation,
    projection: Projection,
    plan: ImplementationPlan,
    market_analysis: Option<MarketAnalysis>,
    narrative: Option<String>,
    report: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateResponse {
    strategy: &'static str,
    name: String,
    risk_profile: Option<RiskProfile>,
    total_weight: f64,
    weights: Vec<BaseWeight>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

pub async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve(args) => {
            let collaborators = build_collaborators(&args.collaborators)?;
            run_http_server(args.port, collaborators).await?;
        }
        Command::Report(args) => {
            let output = render_report(args).await?;
            println!("{output}");
        }
    }
    Ok(())
}

pub fn build_collaborators(args: &CollaboratorArgs) -> Result<Collaborators, MarketError> {
    let mut collaborators = Collaborators::new().with_symbol(args.market_symbol.clone());
    if args.market_data {
        collaborators = collaborators.with_market(YahooChartSource::new(&args.market_base_url)?);
    }
    if let Some(url) = &args.narrative_url {
        collaborators = collaborators.with_narrative(
            HttpNarrative::new(url)?.with_max_new_tokens(args.narrative_max_tokens),
        );
    }
    Ok(collaborators)
}

pub async fn render_report(args: ReportArgs) -> Result<String, CliError> {
    let inputs = build_inputs(args.portfolio, None)?;
    let collaborators = build_collaborators(&args.collaborators)?;
    let response = generate_portfolio(inputs, &collaborators).await?;
    match args.format {
        OutputFormat::Markdown => Ok(response.report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&response)?),
    }
}

fn build_inputs(
    args: PortfolioArgs,
    template: Option<AssetTemplate>,
) -> Result<Inputs, AllocationError> {
    let risk: RiskProfile = args.risk.parse()?;

    let strategy = match (args.strategy, template) {
        (CliStrategy::ThreeBucket, None) => Strategy::ThreeBucket,
        (CliStrategy::ThreeBucket, Some(_)) => {
            return Err(AllocationError::InvalidTemplate(
                "custom templates require the risk-parity strategy".to_string(),
            ));
        }
        (CliStrategy::RiskParity, None) => Strategy::risk_parity(),
        (CliStrategy::RiskParity, Some(template)) => Strategy::RiskParityTemplate(template),
    };

    let inputs = Inputs {
        age: args.age,
        risk,
        monthly_investment: args.monthly_investment,
        strategy,
    };
    validate_inputs(&inputs)?;
    Ok(inputs)
}

async fn generate_portfolio(
    inputs: Inputs,
    collaborators: &Collaborators,
) -> Result<PortfolioResponse, AllocationError> {
    let result = build_portfolio(&inputs)?;
    let enrichment = collaborators.gather().await;
    Ok(build_portfolio_response(&inputs, result, enrichment))
}

fn build_portfolio_response(
    inputs: &Inputs,
    result: PortfolioResult,
    enrichment: Enrichment,
) -> PortfolioResponse {
    let report = PortfolioReport {
        inputs,
        result: &result,
        market: enrichment.market.as_ref(),
        narrative: enrichment.narrative.as_deref(),
    }
    .render_markdown();

    let template_name = match &inputs.strategy {
        Strategy::ThreeBucket => None,
        Strategy::RiskParityTemplate(template) => Some(template.name().to_string()),
    };

    PortfolioResponse {
        summary: SummaryResponse {
            age: inputs.age,
            risk_profile: inputs.risk,
            monthly_investment: inputs.monthly_investment,
        },
        strategy: inputs.strategy.name(),
        template_name,
        allocation: result.allocation,
        projection: result.projection,
        plan: result.plan,
        market_analysis: enrichment.market,
        narrative: enrichment.narrative,
        report,
    }
}

fn strategy_templates() -> Vec<TemplateResponse> {
    let mut templates: Vec<TemplateResponse> = RiskProfile::ALL
        .into_iter()
        .map(|risk| {
            let weights: Vec<BaseWeight> = three_bucket_base(risk)
                .into_iter()
                .map(|(asset, weight)| BaseWeight {
                    asset: asset.to_string(),
                    weight,
                })
                .collect();
            TemplateResponse {
                strategy: Strategy::ThreeBucket.name(),
                name: format!("three-bucket-{}", risk.label().to_lowercase()),
                risk_profile: Some(risk),
                total_weight: weights.iter().map(|w| w.weight).sum(),
                weights,
            }
        })
        .collect();

    let all_weather = AssetTemplate::all_weather();
    templates.push(TemplateResponse {
        strategy: "risk-parity",
        name: all_weather.name().to_string(),
        risk_profile: None,
        total_weight: all_weather.total(),
        weights: all_weather.weights().to_vec(),
    });
    templates
}

pub async fn run_http_server(port: u16, collaborators: Collaborators) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state = AppState {
        collaborators: Arc::new(collaborators),
    };
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/portfolio",
            get(portfolio_get_handler).post(portfolio_post_handler),
        )
        .route("/api/templates", get(templates_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "portfolio HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            error: "Not found".to_string(),
            kind: "not_found",
        },
    )
}

async fn templates_handler() -> Response {
    json_response(StatusCode::OK, strategy_templates())
}

async fn portfolio_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<PortfolioPayload>,
) -> Response {
    portfolio_handler_impl(state, payload).await
}

async fn portfolio_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<PortfolioPayload>,
) -> Response {
    portfolio_handler_impl(state, payload).await
}

async fn portfolio_handler_impl(state: AppState, payload: PortfolioPayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(e) => return allocation_error_response(&e),
    };
    debug!(
        age = inputs.age,
        risk = inputs.risk.label(),
        strategy = inputs.strategy.name(),
        "portfolio request"
    );

    match generate_portfolio(inputs, &state.collaborators).await {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => allocation_error_response(&e),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn allocation_error_response(err: &AllocationError) -> Response {
    debug!(kind = err.kind(), error = %err, "rejected portfolio request");
    json_response(
        StatusCode::BAD_REQUEST,
        ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
        },
    )
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<Inputs, String> {
    let payload = serde_json::from_str::<PortfolioPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload).map_err(|e| e.to_string())
}

fn inputs_from_payload(payload: PortfolioPayload) -> Result<Inputs, AllocationError> {
    let mut args = default_portfolio_args();

    if let Some(v) = payload.age {
        args.age = u32::try_from(v).map_err(|_| AllocationError::InvalidAge(v))?;
    }
    if let Some(v) = payload.risk_tolerance {
        args.risk = v;
    }
    if let Some(v) = payload.monthly_investment {
        args.monthly_investment = v;
    }
    if let Some(v) = payload.strategy {
        args.strategy = v.into();
    }

    let template = match payload.template {
        Some(weights) => {
            if payload.strategy.is_none() {
                args.strategy = CliStrategy::RiskParity;
            }
            let name = payload
                .template_name
                .unwrap_or_else(|| "custom".to_string());
            Some(AssetTemplate::new(
                name,
                weights.into_iter().map(|w| (w.asset, w.weight)),
            )?)
        }
        None => None,
    };

    build_inputs(args, template)
}

// Mirrors the web form's initial values.
fn default_portfolio_args() -> PortfolioArgs {
    PortfolioArgs {
        age: 26,
        risk: RiskProfile::High.label().to_string(),
        monthly_investment: 1_500.0,
        strategy: CliStrategy::ThreeBucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketDataSource;
    use async_trait::async_trait;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> PortfolioArgs {
        default_portfolio_args()
    }

    struct DownMarket;

    #[async_trait]
    impl MarketDataSource for DownMarket {
        async fn fetch_closes(&self, symbol: &str) -> Result<Vec<f64>, MarketError> {
            Err(MarketError::MissingSeries {
                symbol: symbol.to_string(),
            })
        }
    }

    struct RisingMarket;

    #[async_trait]
    impl MarketDataSource for RisingMarket {
        async fn fetch_closes(&self, _symbol: &str) -> Result<Vec<f64>, MarketError> {
            Ok(vec![400.0, 404.0, 402.0, 410.0])
        }
    }

    #[test]
    fn payload_defaults_mirror_the_form() {
        let inputs = inputs_from_json("{}").expect("defaults are valid");
        assert_eq!(inputs.age, 26);
        assert_eq!(inputs.risk, RiskProfile::High);
        assert_approx(inputs.monthly_investment, 1_500.0);
        assert_eq!(inputs.strategy, Strategy::ThreeBucket);
    }

    #[test]
    fn inputs_from_json_parses_web_keys() {
        let json = r#"{
          "age": 41,
          "riskTolerance": "moderate",
          "monthlyInvestment": 750.5,
          "strategy": "risk-parity"
        }"#;
        let inputs = inputs_from_json(json).expect("json should parse");

        assert_eq!(inputs.age, 41);
        assert_eq!(inputs.risk, RiskProfile::Moderate);
        assert_approx(inputs.monthly_investment, 750.5);
        assert_eq!(inputs.strategy, Strategy::risk_parity());
    }

    #[test]
    fn inputs_from_json_accepts_strategy_aliases() {
        let inputs = inputs_from_json(r#"{"strategy": "allWeather", "risk": "Low"}"#)
            .expect("json should parse");
        assert_eq!(inputs.strategy, Strategy::risk_parity());
        assert_eq!(inputs.risk, RiskProfile::Low);
    }

    #[test]
    fn unknown_risk_label_is_rejected() {
        let err = inputs_from_json(r#"{"riskTolerance": "Aggressive"}"#)
            .expect_err("must reject unknown risk label");
        assert!(err.contains("Aggressive"));

        let mut args = sample_args();
        args.risk = "Aggressive".to_string();
        assert_eq!(
            build_inputs(args, None).expect_err("must reject"),
            AllocationError::InvalidRiskProfile("Aggressive".to_string())
        );
    }

    #[test]
    fn build_inputs_rejects_out_of_range_age_and_amount() {
        let mut args = sample_args();
        args.age = 17;
        assert_eq!(
            build_inputs(args, None).expect_err("must reject age"),
            AllocationError::InvalidAge(17)
        );

        let mut args = sample_args();
        args.monthly_investment = -100.0;
        assert_eq!(
            build_inputs(args, None)
                .expect_err("must reject amount")
                .kind(),
            "invalid_amount"
        );
    }

    #[test]
    fn negative_and_oversized_payload_ages_are_invalid_age() {
        let payload = serde_json::from_str::<PortfolioPayload>(r#"{"age": -5}"#).expect("parses");
        let err = inputs_from_payload(payload).expect_err("must reject age");
        assert_eq!(err, AllocationError::InvalidAge(-5));
        assert_eq!(err.kind(), "invalid_age");

        let payload =
            serde_json::from_str::<PortfolioPayload>(r#"{"age": 5000000000}"#).expect("parses");
        let err = inputs_from_payload(payload).expect_err("must reject age");
        assert_eq!(err, AllocationError::InvalidAge(5_000_000_000));

        let err = inputs_from_json(r#"{"age": 101}"#).expect_err("must reject age");
        assert!(err.contains("got 101"));
    }

    #[test]
    fn custom_template_implies_risk_parity() {
        let json = r#"{
          "age": 35,
          "riskTolerance": "Moderate",
          "templateName": "barbell",
          "template": [
            {"asset": "stocks", "weight": 45},
            {"asset": "treasuries", "weight": 45}
          ]
        }"#;
        let inputs = inputs_from_json(json).expect("json should parse");
        let Strategy::RiskParityTemplate(template) = &inputs.strategy else {
            panic!("expected risk-parity strategy");
        };
        assert_eq!(template.name(), "barbell");
        assert_approx(template.total(), 90.0);
    }

    #[test]
    fn custom_template_with_three_bucket_is_rejected() {
        let json = r#"{
          "strategy": "three-bucket",
          "template": [{"asset": "stocks", "weight": 1}]
        }"#;
        let err = inputs_from_json(json).expect_err("must reject template");
        assert!(err.contains("risk-parity"));
    }

    #[test]
    fn invalid_template_weights_are_rejected() {
        let json = r#"{"template": [{"asset": "stocks", "weight": -5}]}"#;
        let err = inputs_from_json(json).expect_err("must reject negative weight");
        assert!(err.contains("invalid asset template"));
    }

    #[test]
    fn error_response_is_bad_request() {
        let response = allocation_error_response(&AllocationError::InvalidAge(150));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );

        let body = serde_json::to_string(&ErrorResponse {
            error: AllocationError::InvalidAge(150).to_string(),
            kind: AllocationError::InvalidAge(150).kind(),
        })
        .expect("error should serialize");
        assert!(body.contains("\"kind\":\"invalid_age\""));
    }

    #[tokio::test]
    async fn portfolio_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.age = 30;
        args.risk = "Moderate".to_string();
        args.monthly_investment = 1_000.0;
        let inputs = build_inputs(args, None).expect("valid inputs");

        let response = generate_portfolio(inputs, &Collaborators::new())
            .await
            .expect("valid portfolio");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"riskProfile\":\"Moderate\""));
        assert!(json.contains("\"strategy\":\"three-bucket\""));
        assert!(json.contains("\"allocation\":[{\"asset\":\"stocks\",\"percent\":42.0}"));
        assert!(json.contains("\"label\":\"conservative_6%\""));
        assert!(json.contains("\"monthlyAmount\""));
        assert!(json.contains("\"rebalancing\":\"quarterly\""));
        assert!(json.contains("\"marketAnalysis\":null"));
        assert!(json.contains("\"report\""));
    }

    #[tokio::test]
    async fn market_failure_does_not_block_portfolio() {
        let collaborators = Collaborators::new().with_market(DownMarket);
        let inputs = build_inputs(sample_args(), None).expect("valid inputs");

        let response = generate_portfolio(inputs, &collaborators)
            .await
            .expect("portfolio must not depend on market data");
        assert!(response.market_analysis.is_none());
        assert_eq!(response.allocation.len(), 3);
        assert!(response.report.contains("Market data unavailable"));
    }

    #[tokio::test]
    async fn market_analysis_flows_into_report() {
        let collaborators = Collaborators::new().with_market(RisingMarket);
        let inputs = build_inputs(sample_args(), None).expect("valid inputs");

        let response = generate_portfolio(inputs, &collaborators)
            .await
            .expect("valid portfolio");
        let market = response.market_analysis.expect("market analysis");
        assert_eq!(market.trend, crate::core::MarketTrend::Bullish);
        assert!(response.report.contains("- **Market Trend**: Bullish"));
    }

    #[test]
    fn templates_listing_covers_both_strategies() {
        let templates = strategy_templates();
        assert_eq!(templates.len(), 4);
        assert!(
            templates[..3]
                .iter()
                .all(|t| t.strategy == "three-bucket" && (t.total_weight - 100.0).abs() < EPS)
        );
        let all_weather = &templates[3];
        assert_eq!(all_weather.strategy, "risk-parity");
        assert_eq!(all_weather.weights.len(), 7);
        assert_approx(all_weather.total_weight, 95.0);
    }

    #[test]
    fn cli_parses_report_subcommand() {
        let cli = Cli::try_parse_from([
            "allweather",
            "report",
            "--age",
            "30",
            "--risk",
            "Moderate",
            "--monthly-investment",
            "1000",
            "--strategy",
            "risk-parity",
            "--format",
            "json",
        ])
        .expect("valid command line");

        let Command::Report(args) = cli.command else {
            panic!("expected report subcommand");
        };
        assert_eq!(args.portfolio.age, 30);
        assert_eq!(args.portfolio.strategy, CliStrategy::RiskParity);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.collaborators.market_data);
        assert_eq!(args.collaborators.market_symbol, "SPY");
    }

    #[test]
    fn cli_parses_serve_subcommand_with_defaults() {
        let cli = Cli::try_parse_from(["allweather", "serve", "--verbose"]).expect("valid");
        assert!(cli.verbose);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, 8080);
        assert!(args.collaborators.narrative_url.is_none());
        assert_eq!(args.collaborators.narrative_max_tokens, DEFAULT_MAX_NEW_TOKENS);
    }

    #[test]
    fn cli_accepts_narrative_settings() {
        let cli = Cli::try_parse_from([
            "allweather",
            "serve",
            "--narrative-url",
            "http://localhost:9000/generate",
            "--narrative-max-tokens",
            "64",
        ])
        .expect("valid command line");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.collaborators.narrative_max_tokens, 64);
        assert!(build_collaborators(&args.collaborators).is_ok());
    }

    #[tokio::test]
    async fn render_report_emits_markdown_and_json() {
        let cli = Cli::try_parse_from([
            "allweather",
            "report",
            "--age",
            "30",
            "--risk",
            "Moderate",
            "--monthly-investment",
            "1000",
        ])
        .expect("valid command line");
        let Command::Report(args) = cli.command else {
            panic!("expected report subcommand");
        };
        let markdown = render_report(args).await.expect("report renders");
        assert!(markdown.starts_with("# All-Weather Portfolio Report"));
        assert!(markdown.contains("- 10 Years: **$214,901.72**"));

        let cli = Cli::try_parse_from([
            "allweather",
            "report",
            "--age",
            "30",
            "--risk",
            "Low",
            "--monthly-investment",
            "500",
            "--format",
            "json",
        ])
        .expect("valid command line");
        let Command::Report(args) = cli.command else {
            panic!("expected report subcommand");
        };
        let json = render_report(args).await.expect("report renders");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["summary"]["age"], 30);
        assert_eq!(value["allocation"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn render_report_rejects_invalid_risk() {
        let cli = Cli::try_parse_from([
            "allweather",
            "report",
            "--age",
            "30",
            "--risk",
            "Aggressive",
            "--monthly-investment",
            "1000",
        ])
        .expect("clap accepts any label");
        let Command::Report(args) = cli.command else {
            panic!("expected report subcommand");
        };
        let err = render_report(args).await.expect_err("must reject");
        assert!(matches!(
            err,
            CliError::Allocation(AllocationError::InvalidRiskProfile(_))
        ));
    }
}
