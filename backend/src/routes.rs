use std::{
    fs::Metadata,
    io,
    path::{Path, PathBuf},
};

use actix_multipart::{Field, Multipart};
use actix_web::{
    HttpResponse, get,
    body::SizedStream,
    http::header::{ContentDisposition, ContentType},
    middleware::from_fn,
    web,
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    assets::serve_asset,
    auth::require_password,
    error::AppError,
    format::format_size,
    models::files::{FileEntry, MessageResponse, UploadResponse},
    paths::join_relative,
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "log", "json", "xml", "csv"];

pub fn register(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(stats)
        .service(
            web::resource("/files")
                .route(web::get().to(list_files))
                .default_service(web::to(method_not_allowed))
                .wrap(from_fn(require_password)),
        )
        .service(
            web::resource("/download")
                .route(web::get().to(download))
                .default_service(web::to(method_not_allowed))
                .wrap(from_fn(require_password)),
        )
        .service(
            web::resource("/upload")
                .route(web::post().to(upload))
                .default_service(web::to(method_not_allowed))
                .wrap(from_fn(require_password)),
        )
        .service(
            web::resource("/delete")
                .route(web::delete().to(delete_file))
                .default_service(web::to(method_not_allowed))
                .wrap(from_fn(require_password)),
        )
        .service(
            web::resource("/preview")
                .route(web::get().to(preview))
                .default_service(web::to(method_not_allowed))
                .wrap(from_fn(require_password)),
        )
        .service(serve_asset);
}

#[get("/healthz")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "beamdrop",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/stats")]
async fn stats(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.stats.snapshot())
}

async fn method_not_allowed() -> Result<HttpResponse, AppError> {
    Err(AppError::MethodNotAllowed)
}

#[derive(Deserialize)]
struct ListQuery {
    path: Option<String>,
}

async fn list_files(
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let requested = non_empty(query.into_inner().path).unwrap_or_else(|| ".".into());
    let dir = state.resolve(&requested).await?;

    let mut reader = fs::read_dir(&dir).await.map_err(|err| {
        debug!(path = %requested, error = %err, "cannot read directory");
        AppError::NotFound("Directory not found".into())
    })?;

    let mut entries = Vec::new();
    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(path = %requested, error = %err, "directory listing stopped early");
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.extend(listing_entry(&requested, name, entry.metadata().await));
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

    if state.config.verbose {
        info!(count = entries.len(), path = %requested, "listed directory");
    }

    Ok(HttpResponse::Ok().json(entries))
}

/// Builds the entry for one child of `requested`; children that cannot be
/// inspected are left out of the listing.
fn listing_entry(
    requested: &str,
    name: String,
    metadata: io::Result<Metadata>,
) -> Option<FileEntry> {
    match metadata {
        Ok(metadata) => {
            let path = join_relative(requested, &name);
            Some(FileEntry::from_metadata(name, path, &metadata))
        }
        Err(err) => {
            warn!(name = %name, error = %err, "skipping entry that cannot be inspected");
            None
        }
    }
}

#[derive(Deserialize)]
struct FileQuery {
    file: Option<String>,
}

impl FileQuery {
    fn required(self) -> Result<String, AppError> {
        non_empty(self.file).ok_or_else(|| AppError::BadRequest("Missing file parameter".into()))
    }
}

async fn download(
    query: web::Query<FileQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let requested = query.into_inner().required()?;
    let path = state.resolve(&requested).await?;
    let (file, len) = open_regular_file(&path).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".into());

    state.stats.record_download();
    if state.config.verbose {
        info!(file = %requested, size = %format_size(len), "download started");
    }

    Ok(HttpResponse::Ok()
        .insert_header(ContentDisposition::attachment(file_name))
        .insert_header(ContentType::octet_stream())
        .body(SizedStream::new(len, ReaderStream::new(file))))
}

async fn preview(
    query: web::Query<FileQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let requested = query.into_inner().required()?;
    let path = state.resolve(&requested).await?;
    let (file, len) = open_regular_file(&path).await?;

    Ok(HttpResponse::Ok()
        .content_type(preview_content_type(&path))
        .body(SizedStream::new(len, ReaderStream::new(file))))
}

async fn delete_file(
    query: web::Query<FileQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let requested = query.into_inner().required()?;
    let path = state.resolve(&requested).await?;

    fs::remove_file(&path).await.map_err(|err| {
        debug!(file = %requested, error = %err, "delete failed");
        AppError::NotFound("File not found or cannot be deleted".into())
    })?;

    if state.config.verbose {
        info!(file = %requested, "deleted file");
    }

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "File deleted successfully".into(),
    }))
}

/// Accepts a `file` field and an optional `path` field naming the destination
/// directory, in either order. The file is spooled under the shared root and
/// only moved into place once the whole form has been read.
async fn upload(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = UploadForm::default();
    let result = match read_upload_form(&state, &mut payload, &mut form).await {
        Ok(()) => place_upload(&state, &form).await,
        Err(err) => Err(err),
    };

    if result.is_err() {
        if let Some(spool) = &form.file {
            discard_spool(&spool.partial).await;
        }
    }
    let (upload_dir, spool) = result?;

    state.stats.record_upload();
    if state.config.verbose {
        info!(file = %spool.file_name, dir = %upload_dir, bytes = spool.written, "uploaded file");
    }

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: "Uploaded successfully".into(),
        file: spool.file_name.clone(),
    }))
}

#[derive(Default)]
struct UploadForm {
    path: Option<String>,
    file: Option<SpooledFile>,
}

struct SpooledFile {
    file_name: String,
    partial: PathBuf,
    written: u64,
}

async fn read_upload_form(
    state: &AppState,
    payload: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), AppError> {
    while let Some(mut field) = payload.try_next().await.map_err(|err| {
        debug!(error = %err, "malformed multipart body");
        AppError::invalid_upload()
    })? {
        let content_disposition = field.content_disposition().clone();
        let field_name = content_disposition.get_name().unwrap_or("").to_string();

        match field_name.as_str() {
            "path" => {
                if form.path.is_some() {
                    return Err(AppError::invalid_upload());
                }
                form.path = non_empty(Some(collect_text_field(&mut field).await?));
            }
            "file" => {
                if form.file.is_some() {
                    return Err(AppError::invalid_upload());
                }
                let file_name = upload_file_name(content_disposition.get_filename())?;
                let partial = state
                    .config
                    .shared_dir
                    .join(format!(".beamdrop-{}.part", Uuid::new_v4().simple()));
                let mut out = File::create(&partial)
                    .await
                    .map_err(|err| storage_error("Failed to save file", &partial, err))?;

                let spool = form.file.insert(SpooledFile {
                    file_name,
                    partial,
                    written: 0,
                });
                spool.written = copy_field(&mut field, &mut out, &spool.partial).await?;
            }
            _ => {
                drain_field(&mut field).await?;
            }
        }
    }
    Ok(())
}

/// Moves the spooled file to `<path>/<file name>`, checking both the directory
/// and the final target against the shared root.
async fn place_upload<'a>(
    state: &AppState,
    form: &'a UploadForm,
) -> Result<(String, &'a SpooledFile), AppError> {
    let spool = form.file.as_ref().ok_or_else(AppError::invalid_upload)?;
    let upload_dir = form.path.clone().unwrap_or_else(|| ".".into());

    let dir = state.resolve(&upload_dir).await?;
    let target = state
        .resolve(&join_relative(&upload_dir, &spool.file_name))
        .await?;

    fs::create_dir_all(&dir)
        .await
        .map_err(|err| storage_error("Failed to save file", &dir, err))?;
    fs::rename(&spool.partial, &target)
        .await
        .map_err(|err| storage_error("Failed to save file", &target, err))?;

    Ok((upload_dir, spool))
}

/// Keeps only the final component of the client-supplied filename.
fn upload_file_name(raw: Option<&str>) -> Result<String, AppError> {
    raw.map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(AppError::invalid_upload)
}

async fn copy_field(field: &mut Field, out: &mut File, path: &Path) -> Result<u64, AppError> {
    let mut written = 0u64;
    while let Some(chunk) = field.try_next().await.map_err(|err| {
        debug!(error = %err, "upload stream interrupted");
        AppError::invalid_upload()
    })? {
        out.write_all(&chunk)
            .await
            .map_err(|err| storage_error("Failed to write file", path, err))?;
        written += chunk.len() as u64;
    }
    out.flush()
        .await
        .map_err(|err| storage_error("Failed to write file", path, err))?;
    Ok(written)
}

async fn discard_spool(partial: &Path) {
    match fs::remove_file(partial).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(path = %partial.display(), error = %err, "failed to remove partial upload");
        }
    }
}

async fn open_regular_file(path: &Path) -> Result<(File, u64), AppError> {
    let not_found = || AppError::NotFound("File not found".into());
    let file = File::open(path).await.map_err(|_| not_found())?;
    let metadata = file.metadata().await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    Ok((file, metadata.len()))
}

fn preview_content_type(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        mime_guess::from_ext(&extension)
            .first_or_octet_stream()
            .to_string()
    } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
        "text/plain".into()
    } else {
        "application/octet-stream".into()
    }
}

fn storage_error(message: &'static str, path: &Path, source: io::Error) -> AppError {
    error!(path = %path.display(), error = %source, "{message}");
    AppError::Storage { message, source }
}

/// Treats blank values as absent. Non-blank values are kept verbatim, since
/// leading or trailing spaces are legal in file names.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

async fn collect_text_field(field: &mut Field) -> Result<String, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|_| AppError::invalid_upload())?
    {
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data).map_err(|_| AppError::invalid_upload())
}

async fn drain_field(field: &mut Field) -> Result<(), AppError> {
    while field
        .try_next()
        .await
        .map_err(|_| AppError::invalid_upload())?
        .is_some()
    {}
    Ok(())
}
