use crate::adapters::html::CardExtractor;
use crate::core::{ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::model::ClientCard;
use crate::utils::error::{AuditError, Result};

fn record_to_card(record: &Record) -> Result<ClientCard> {
    let value = serde_json::to_value(&record.data)?;
    serde_json::from_value(value).map_err(AuditError::SerializationError)
}

fn cards_to_records(cards: &[ClientCard]) -> Result<Vec<Record>> {
    cards
        .iter()
        .map(|card| Ok(Record::from_value(serde_json::to_value(card)?)))
        .collect()
}

fn write_csv(header: [&str; 5], rows: &[[String; 5]]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AuditError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })?;
    String::from_utf8(bytes).map_err(|e| AuditError::ProcessingError {
        message: format!("CSV output was not UTF-8: {}", e),
    })
}

/// Free-text fields keep their content but lose line breaks in CSV output.
fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Scrapes saved listing pages (`p*.html`) into `clients.json` + `clients.csv`.
pub struct ClientScrapePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    input_dir: String,
    page_prefix: String,
    json_output: String,
    csv_output: String,
    extractor: CardExtractor,
}

impl<S: Storage, C: ConfigProvider> ClientScrapePipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        input_dir: String,
        page_prefix: String,
        json_output: String,
        csv_output: String,
    ) -> Self {
        Self {
            storage,
            config,
            input_dir,
            page_prefix,
            json_output,
            csv_output,
            extractor: CardExtractor::new(),
        }
    }

    fn is_listing_page(&self, name: &str) -> bool {
        name.starts_with(&self.page_prefix) && name.ends_with(".html")
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ClientScrapePipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let mut cards = Vec::new();
        let mut page_count = 0;

        for name in self.storage.list_files(&self.input_dir).await? {
            if !self.is_listing_page(&name) {
                continue;
            }
            page_count += 1;

            let path = if self.input_dir == "." {
                name.clone()
            } else {
                format!("{}/{}", self.input_dir, name)
            };
            let bytes = self.storage.read_file(&path).await?;
            let html = String::from_utf8(bytes).map_err(|e| AuditError::ScrapeError {
                file: name.clone(),
                reason: format!("not valid UTF-8: {}", e),
            })?;

            let page_cards = self
                .extractor
                .extract_cards(&html, self.config.listing_base_url());
            tracing::info!("Found {} cards in {}", page_cards.len(), name);
            cards.extend(page_cards);
        }

        if page_count == 0 {
            tracing::warn!(
                "No listing pages matching '{}*.html' in {}",
                self.page_prefix,
                self.input_dir
            );
        }

        cards_to_records(&cards)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let cards = data
            .iter()
            .map(record_to_card)
            .collect::<Result<Vec<_>>>()?;

        if cards.is_empty() {
            tracing::warn!("Scraped 0 clients; writing empty outputs");
        }

        let json_output = serde_json::to_string_pretty(&cards)?;

        let rows: Vec<[String; 5]> = cards
            .iter()
            .map(|card| {
                [
                    card.title.clone(),
                    card.url.clone(),
                    card.stars.to_string(),
                    normalize_newlines(&card.description),
                    card.category.clone(),
                ]
            })
            .collect();
        let csv_output = write_csv(["title", "url", "stars", "description", "category"], &rows)?;

        Ok(TransformResult {
            processed_records: data,
            json_output,
            csv_output: Some(csv_output),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        self.storage
            .write_file(&self.json_output, result.json_output.as_bytes())
            .await?;

        if let Some(csv_output) = &result.csv_output {
            self.storage
                .write_file(&self.csv_output, csv_output.as_bytes())
                .await?;
        }

        tracing::info!(
            "Scraped {} clients into {} and {}",
            result.processed_records.len(),
            self.json_output,
            self.csv_output
        );
        Ok(self.json_output.clone())
    }
}

/// Re-exports `clients.json` as a CSV, optionally keeping only entries
/// tagged `type = "client"`.
pub struct ClientExportPipeline<S: Storage> {
    storage: S,
    input: String,
    csv_output: String,
    only_clients: bool,
}

impl<S: Storage> ClientExportPipeline<S> {
    pub fn new(storage: S, input: String, csv_output: String, only_clients: bool) -> Self {
        Self {
            storage,
            input,
            csv_output,
            only_clients,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ClientExportPipeline<S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let bytes = self.storage.read_file(&self.input).await?;
        let cards: Vec<ClientCard> = serde_json::from_slice(&bytes)?;
        cards_to_records(&cards)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let cards = data
            .iter()
            .map(record_to_card)
            .collect::<Result<Vec<_>>>()?;

        let kept: Vec<ClientCard> = if self.only_clients {
            cards
                .into_iter()
                .filter(|card| card.kind.as_deref() == Some("client"))
                .collect()
        } else {
            cards
        };

        let rows: Vec<[String; 5]> = kept
            .iter()
            .map(|card| {
                [
                    card.title.clone(),
                    card.url.clone(),
                    card.stars.to_string(),
                    normalize_newlines(&card.description),
                    card.category.clone(),
                ]
            })
            .collect();
        let csv_output = write_csv(
            ["name", "github_url", "stars", "description", "category"],
            &rows,
        )?;

        let json_output = serde_json::to_string_pretty(&kept)?;
        let processed_records = cards_to_records(&kept)?;

        Ok(TransformResult {
            processed_records,
            json_output,
            csv_output: Some(csv_output),
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let csv_output = result.csv_output.as_deref().unwrap_or_default();
        self.storage
            .write_file(&self.csv_output, csv_output.as_bytes())
            .await?;

        tracing::info!(
            "Wrote {} clients to {}",
            result.processed_records.len(),
            self.csv_output
        );
        Ok(self.csv_output.clone())
    }
}
