use std::env;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware, put, web};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use wagon_core::io::{list_files, normalize_folder};
use wagon_core::utils::nonzero_natural;
use wagon_core::{GenerationInput, StartMode, Table, TableBuilder, WagonError, WordGenerator};

/// Server configuration, read from the environment.
///
/// - `WAGON_BIND`: listening address (default `127.0.0.1:5000`)
/// - `WAGON_DATA`: folder holding the corpora (default `./data`)
/// - `WAGON_MAX_COUNT`: most words a single request may ask for (default 1000)
/// - `WAGON_MAX_LENGTH`: longest word a request may ask for (default 1000)
#[derive(Clone, Debug)]
struct ServerConfig {
	bind: String,
	data: PathBuf,
	max_count: usize,
	max_length: usize,
}

impl ServerConfig {
	const DEFAULT_LIMIT: usize = 1000;

	fn from_env() -> Result<Self, WagonError> {
		let bind = env::var("WAGON_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
		let data = normalize_folder(&env::var("WAGON_DATA").unwrap_or_else(|_| "./data".to_owned()));
		Ok(Self {
			bind,
			data,
			max_count: Self::limit("WAGON_MAX_COUNT")?,
			max_length: Self::limit("WAGON_MAX_LENGTH")?,
		})
	}

	fn limit(name: &str) -> Result<usize, WagonError> {
		match env::var(name) {
			Ok(value) => nonzero_natural(&value)
				.map_err(|e| WagonError::InvalidConfiguration(format!("{}: {}", name, e))),
			Err(_) => Ok(Self::DEFAULT_LIMIT),
		}
	}

	/// Rejects requests above the configured limits.
	fn check_limits(&self, length: usize, count: usize) -> Result<(), WagonError> {
		if length > self.max_length {
			return Err(WagonError::InvalidConfiguration(format!(
				"length {} is above the limit of {}",
				length, self.max_length
			)));
		}
		if count > self.max_count {
			return Err(WagonError::InvalidConfiguration(format!(
				"count {} is above the limit of {}",
				count, self.max_count
			)));
		}
		Ok(())
	}
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	length: Option<usize>,
	count: Option<usize>,
	window: Option<usize>,
	start: Option<bool>,
	end: Option<bool>,
	flatten: Option<bool>,
	max_draws: Option<usize>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct TableQuery {
	name: Option<String>,
	prefix: Option<usize>,
	flatten: Option<bool>,
}

/// The loaded table; generation only reads it.
#[derive(Default)]
struct SharedData {
	name: Option<String>,
	table: Option<Table>,
}

impl GenerateParams {
	/// Builds the generation input, with defaults for missing parameters.
	fn generation_input(&self) -> Result<GenerationInput, WagonError> {
		let mut input = GenerationInput::new(self.length.unwrap_or(10))?;
		input.window = self.window.unwrap_or(0);
		input.require_end = self.end.unwrap_or(false);
		input.flatten = self.flatten.unwrap_or(false);
		input.set_max_draws(self.max_draws)?;
		if self.start.unwrap_or(false) {
			input.start = StartMode::InModel;
		}
		Ok(input)
	}
}

/// Maps a core error to an HTTP response.
fn error_response(error: WagonError) -> HttpResponse {
	match error {
		WagonError::InvalidConfiguration(_) => HttpResponse::BadRequest().body(error.to_string()),
		WagonError::GenerationExhausted { .. } | WagonError::BudgetExceeded(_) => {
			HttpResponse::UnprocessableEntity().body(error.to_string())
		}
		_ => {
			log::error!("{}", error);
			HttpResponse::InternalServerError().body(error.to_string())
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` words from the loaded table based on query parameters.
/// Returns the words as the response body, one per line.
#[get("/v1/generate")]
async fn get_generated(
	data: web::Data<RwLock<SharedData>>,
	config: web::Data<ServerConfig>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let input = match query.generation_input() {
		Ok(input) => input,
		Err(e) => return error_response(e),
	};
	let count = query.count.unwrap_or(1);
	if let Err(e) = config.check_limits(input.length(), count) {
		return error_response(e);
	}

	let shared_data = match data.read() {
		Ok(guard) => guard,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};
	let Some(table) = &shared_data.table else {
		return HttpResponse::Conflict().body("No table loaded");
	};

	let generator = WordGenerator::new(table);
	let words = match query.seed {
		Some(seed) => generator.generate_many(&input, count, &mut StdRng::seed_from_u64(seed)),
		None => generator.generate_many(&input, count, &mut rand::rng()),
	};
	match words {
		Ok(words) => HttpResponse::Ok().body(words.join("\n")),
		Err(e) => error_response(e),
	}
}

#[get("/v1/tables")]
async fn get_tables(config: web::Data<ServerConfig>) -> impl Responder {
	match list_files(&config.data, "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list tables"),
	}
}

#[get("/v1/loaded_table")]
async fn get_loaded_table(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	match data.read() {
		Ok(shared_data) => HttpResponse::Ok().body(shared_data.name.clone().unwrap_or_default()),
		Err(_) => HttpResponse::InternalServerError().body("Table lock failed"),
	}
}

/// HTTP GET endpoint `/v1/check`
///
/// Reports whether the loaded table is complete.
#[get("/v1/check")]
async fn get_check(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let shared_data = match data.read() {
		Ok(guard) => guard,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};
	let Some(table) = &shared_data.table else {
		return HttpResponse::Conflict().body("No table loaded");
	};

	let dead_ends: String = table.dead_ends().into_iter().collect();
	HttpResponse::Ok().body(format!(
		"complete: {}\ncomplete_ignoring_end: {}\ndead_ends: {}",
		table.is_complete(),
		table.is_complete_ignoring_end(),
		dead_ends
	))
}

/// Loads `<data>/<name>.txt` (raw text) or `<data>/<name>.bin` (saved table).
fn load_table(folder: &Path, name: &str, builder: &TableBuilder) -> Result<Option<Table>, WagonError> {
	let text_path = folder.join(format!("{}.txt", name));
	if text_path.is_file() {
		return Table::from_text_file(text_path, builder).map(Some);
	}
	let table_path = folder.join(format!("{}.bin", name));
	if table_path.is_file() {
		return Table::load(table_path).map(Some);
	}
	Ok(None)
}

#[put("/v1/load_table")]
async fn put_table(
	data: web::Data<RwLock<SharedData>>,
	config: web::Data<ServerConfig>,
	query: web::Query<TableQuery>,
) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim().to_owned(),
		_ => return HttpResponse::BadRequest().body("Missing or empty table name"),
	};
	if name.contains(['/', '\\']) || name.starts_with('.') {
		return HttpResponse::BadRequest().body("Invalid table name");
	}

	let builder = TableBuilder::new()
		.prefix(query.prefix.unwrap_or(0))
		.flatten(query.flatten.unwrap_or(false));
	let table = match load_table(&config.data, &name, &builder) {
		Ok(Some(table)) => table,
		Ok(None) => return HttpResponse::NotFound().body(format!("Table {} not found", name)),
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load table: {e}")),
	};
	log::info!("loaded table {} ({} contexts)", name, table.len());

	let mut shared_data = match data.write() {
		Ok(guard) => guard,
		Err(_) => return HttpResponse::InternalServerError().body("Table lock failed"),
	};
	shared_data.name = Some(name);
	shared_data.table = Some(table);

	HttpResponse::Ok().body("Table loaded successfully")
}

/// Main entry point for the server.
///
/// Wraps the loaded table in a `RwLock` (generation only takes the read
/// side) and starts an Actix-web HTTP server.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
	log::info!("serving tables from {} on {}", config.data.display(), config.bind);

	let shared_table = web::Data::new(RwLock::new(SharedData::default()));
	let shared_config = web::Data::new(config.clone());

	HttpServer::new(move || {
		App::new()
			.wrap(middleware::Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_table.clone())
			.app_data(shared_config.clone())
			.service(get_generated)
			.service(get_tables)
			.service(put_table)
			.service(get_loaded_table)
			.service(get_check)
	})
	.bind(config.bind.as_str())?
	.run()
	.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;

	fn config(data: &Path) -> web::Data<ServerConfig> {
		web::Data::new(ServerConfig { bind: String::new(), data: data.to_path_buf(), max_count: 10, max_length: 20 })
	}

	macro_rules! app {
		($shared:expr, $config:expr) => {
			test::init_service(
				App::new()
					.app_data($shared.clone())
					.app_data($config.clone())
					.service(get_generated)
					.service(get_tables)
					.service(put_table)
					.service(get_loaded_table)
					.service(get_check),
			)
			.await
		};
	}

	#[actix_web::test]
	async fn generate_without_table_conflicts() {
		let dir = tempfile::tempdir().unwrap();
		let shared = web::Data::new(RwLock::new(SharedData::default()));
		let app = app!(shared, config(dir.path()));

		let req = test::TestRequest::get().uri("/v1/generate?length=4").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::CONFLICT);
	}

	#[actix_web::test]
	async fn load_then_generate() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("fruits.txt"), "banana bandana cabana anna").unwrap();
		let shared = web::Data::new(RwLock::new(SharedData::default()));
		let app = app!(shared, config(dir.path()));

		let req = test::TestRequest::get().uri("/v1/tables").to_request();
		assert_eq!(&test::call_and_read_body(&app, req).await[..], b"fruits");

		let req = test::TestRequest::put().uri("/v1/load_table?name=fruits").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/loaded_table").to_request();
		assert_eq!(&test::call_and_read_body(&app, req).await[..], b"fruits");

		let req = test::TestRequest::get().uri("/v1/generate?length=6&count=4&seed=3").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let body = String::from_utf8(body.to_vec()).unwrap();
		let words: Vec<&str> = body.lines().collect();
		assert_eq!(words.len(), 4);
		assert!(words.iter().all(|word| word.chars().count() == 6));

		let req = test::TestRequest::get().uri("/v1/check").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert!(String::from_utf8(body.to_vec()).unwrap().starts_with("complete: false"));
	}

	#[actix_web::test]
	async fn bad_requests() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("ab.txt"), "ab").unwrap();
		let shared = web::Data::new(RwLock::new(SharedData::default()));
		let app = app!(shared, config(dir.path()));

		let req = test::TestRequest::put().uri("/v1/load_table?name=missing").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::put().uri("/v1/load_table?name=../ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put().uri("/v1/load_table?name=ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/generate?length=0").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/generate?length=5").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNPROCESSABLE_ENTITY);
	}

	#[actix_web::test]
	async fn requests_above_limits_are_rejected() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("ab.txt"), "ab ba").unwrap();
		let shared = web::Data::new(RwLock::new(SharedData::default()));
		let app = app!(shared, config(dir.path()));

		let req = test::TestRequest::put().uri("/v1/load_table?name=ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/generate?length=2&count=11").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/generate?length=21").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get()
			.uri(&format!("/v1/generate?length={}&count={}", usize::MAX, usize::MAX))
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/generate?length=2&count=10&seed=1").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(String::from_utf8(body.to_vec()).unwrap().lines().count(), 10);
	}

	#[::core::prelude::v1::test]
	fn limits_are_inclusive() {
		let config = ServerConfig { bind: String::new(), data: PathBuf::new(), max_count: 3, max_length: 4 };
		assert!(config.check_limits(4, 3).is_ok());
		assert!(config.check_limits(5, 3).is_err());
		assert!(config.check_limits(4, 4).is_err());
	}
}
