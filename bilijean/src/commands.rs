//! Subcommand handlers; results are printed to stdout as pretty JSON.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use bilijean_core::streaming::{Page, PlayRequest, ResourceLocator, SourcePreferences, StreamSource};
use bilijean_core::StreamingService;
use bilijean_providers::download::download_client;
use bilijean_providers::{BilibiliInterface, PageDownloader};
use serde::Serialize;
use serde_json::json;
use tracing::info;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Selected page with the given index, or the first selected page.
fn pick_page(pages: &[Page], index: Option<u32>) -> Result<&Page> {
    let mut selected = pages.iter().filter(|p| p.is_selected);
    match index {
        Some(index) => selected
            .find(|p| p.index == index)
            .ok_or_else(|| anyhow!("no selected page with index {index}")),
        None => selected.next().ok_or_else(|| anyhow!("the link does not select any page")),
    }
}

async fn resolve(
    service: &StreamingService,
    url: &str,
    page: Option<u32>,
    prefs: &SourcePreferences,
) -> Result<(ResourceLocator, Page, StreamSource)> {
    let (locator, pages) = service.pages_for_url(url).await?;
    let page = pick_page(&pages, page)?.clone();
    let request = PlayRequest::from_page(&page);
    let source = service
        .get_stream_source(locator.category(), &request, prefs)
        .await
        .with_context(|| format!("Failed to negotiate a stream for page {} ({})", page.index, page.title))?;
    Ok((locator, page, source))
}

pub async fn classify(service: &StreamingService, url: &str) -> Result<()> {
    match service.classify(url).await {
        Some(locator) => print_json(&json!({
            "category": locator.category(),
            "id": locator.id(),
            "canonical_url": locator.canonical_url(),
        })),
        None => Err(anyhow!("{url} is not a supported video, series or course link")),
    }
}

pub async fn pages(service: &StreamingService, url: &str) -> Result<()> {
    let (_, pages) = service.pages_for_url(url).await?;
    print_json(&pages)
}

pub async fn source(service: &StreamingService, url: &str, page: Option<u32>, prefs: &SourcePreferences) -> Result<()> {
    let (locator, page, source) = resolve(service, url, page, prefs).await?;
    print_json(&json!({
        "category": locator.category(),
        "page": page.index,
        "cid": page.cid,
        "title": page.title,
        "source": source,
    }))
}

pub async fn download(
    service: &StreamingService,
    url: &str,
    dir: &Path,
    page: Option<u32>,
    prefs: &SourcePreferences,
) -> Result<()> {
    let (_, page, source) = resolve(service, url, page, prefs).await?;
    let client = download_client();

    let video_path = dir.join(format!("{}-video.m4s", page.cid));
    info!(cid = page.cid, url = %source.video.url, path = %video_path.display(), "Downloading video stream");
    let video = PageDownloader::new(client.clone(), &source.video.url, video_path)?
        .download()
        .await
        .context("Failed to download the video stream")?;

    let audio = match &source.audio {
        Some(audio) => {
            let audio_path = dir.join(format!("{}-audio.m4s", page.cid));
            info!(cid = page.cid, url = %audio.url, path = %audio_path.display(), "Downloading audio stream");
            let path = PageDownloader::new(client, &audio.url, audio_path)?
                .download()
                .await
                .context("Failed to download the audio stream")?;
            Some(path)
        }
        None => None,
    };

    print_json(&json!({
        "cid": page.cid,
        "title": page.title,
        "video": video,
        "audio": audio,
    }))
}

/// Session state, with the account profile when the cookie is accepted.
async fn session_summary(api: &dyn BilibiliInterface) -> Result<serde_json::Value> {
    if !api.validate_session().await? {
        return Ok(json!({ "logged_in": false }));
    }
    let resp = api.get_my_info().await?;
    let me = resp
        .payload()
        .ok_or_else(|| anyhow!("account profile missing after a valid session (code {})", resp.code))?;
    Ok(json!({
        "logged_in": true,
        "mid": me.mid,
        "name": me.name,
        "face": me.face,
    }))
}

pub async fn whoami(service: &StreamingService) -> Result<()> {
    print_json(&session_summary(service.api().as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilijean_core::streaming::{CollectionMeta, StreamingCategory, ViewMeta};
    use bilijean_providers::BilibiliClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page(index: u32, is_selected: bool) -> Page {
        Page {
            category: StreamingCategory::Ugc,
            index,
            cid: u64::from(index) * 10,
            title: format!("P{index}"),
            duration: 60,
            view: ViewMeta::default(),
            collection: CollectionMeta::default(),
            is_selected,
        }
    }

    #[test]
    fn test_pick_page() {
        let pages = vec![page(1, false), page(2, true), page(3, true)];
        assert_eq!(pick_page(&pages, None).unwrap().index, 2);
        assert_eq!(pick_page(&pages, Some(3)).unwrap().index, 3);
        assert!(pick_page(&pages, Some(1)).is_err());
        assert!(pick_page(&[page(1, false)], None).is_err());
    }

    #[tokio::test]
    async fn test_session_summary_logged_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/space/myinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": -101, "message": "账号未登录"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = BilibiliClient::new().with_api_base(server.uri());
        let summary = session_summary(&client).await.unwrap();
        assert_eq!(summary, json!({"logged_in": false}));
    }

    #[tokio::test]
    async fn test_session_summary_logged_in() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/space/myinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0,
                "message": "0",
                "data": {"mid": 7, "name": "bishi", "face": "https://i0.hdslb.com/face.jpg"}
            })))
            .mount(&server)
            .await;

        let client = BilibiliClient::new()
            .with_api_base(server.uri())
            .with_sess_data(Some("abc".to_string()));
        let summary = session_summary(&client).await.unwrap();
        assert_eq!(summary["logged_in"], json!(true));
        assert_eq!(summary["mid"], json!(7));
        assert_eq!(summary["name"], json!("bishi"));
    }
}
