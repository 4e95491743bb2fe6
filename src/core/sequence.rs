use crate::domain::model::{Record, TransformResult};
use crate::utils::error::{AuditError, Result};
use crate::utils::monitor::SystemMonitor;
use std::collections::HashMap;
use std::time::Instant;

/// Result of one executed pipeline in a sequence.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub pipeline_name: String,
    pub records: Vec<Record>,
    pub output_path: String,
    pub duration: std::time::Duration,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Execution context passed along the sequence so later pipelines can read
/// what earlier ones produced without re-reading files.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub previous_results: Vec<PipelineResult>,
    pub shared_data: HashMap<String, serde_json::Value>,
    pub execution_id: String,
    pipeline_data: HashMap<String, Vec<Record>>,
}

impl PipelineContext {
    pub fn new(execution_id: String) -> Self {
        Self {
            previous_results: Vec::new(),
            shared_data: HashMap::new(),
            execution_id,
            pipeline_data: HashMap::new(),
        }
    }

    pub fn get_previous_result(&self) -> Option<&PipelineResult> {
        self.previous_results.last()
    }

    pub fn get_result_by_name(&self, name: &str) -> Option<&PipelineResult> {
        self.previous_results
            .iter()
            .find(|r| r.pipeline_name == name)
    }

    pub fn get_all_previous_records(&self) -> Vec<Record> {
        self.previous_results
            .iter()
            .flat_map(|result| result.records.clone())
            .collect()
    }

    pub fn add_pipeline_data(&mut self, pipeline_name: String, records: Vec<Record>) {
        self.pipeline_data.insert(pipeline_name, records);
    }

    pub fn get_pipeline_data(&self, pipeline_name: &str) -> Option<&Vec<Record>> {
        self.pipeline_data.get(pipeline_name)
    }

    pub fn add_shared_data(&mut self, key: String, value: serde_json::Value) {
        self.shared_data.insert(key, value);
    }

    pub fn get_shared_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.shared_data.get(key)
    }

    pub fn add_result(&mut self, result: PipelineResult) {
        self.add_pipeline_data(result.pipeline_name.clone(), result.records.clone());
        self.previous_results.push(result);
    }
}

/// A pipeline that can see the results of earlier stages in the audit.
#[async_trait::async_trait]
pub trait ContextualPipeline: Send + Sync {
    async fn extract_with_context(&self, context: &PipelineContext) -> Result<Vec<Record>>;
    async fn transform_with_context(
        &self,
        data: Vec<Record>,
        context: &PipelineContext,
    ) -> Result<TransformResult>;
    async fn load_with_context(
        &self,
        result: TransformResult,
        context: &PipelineContext,
    ) -> Result<String>;

    fn get_name(&self) -> &str;

    /// 根據上下文決定是否執行
    fn should_execute(&self, _context: &PipelineContext) -> bool {
        true
    }
}

/// Adapts a plain pipeline into a sequence stage. A stage with a `requires`
/// dependency only runs when that stage executed and produced records.
pub struct SequencedPipeline<P: crate::domain::ports::Pipeline> {
    name: String,
    inner: P,
    requires: Option<String>,
}

impl<P: crate::domain::ports::Pipeline> SequencedPipeline<P> {
    pub fn new(name: &str, inner: P) -> Self {
        Self {
            name: name.to_string(),
            inner,
            requires: None,
        }
    }

    pub fn requires(mut self, stage: &str) -> Self {
        self.requires = Some(stage.to_string());
        self
    }
}

#[async_trait::async_trait]
impl<P: crate::domain::ports::Pipeline> ContextualPipeline for SequencedPipeline<P> {
    async fn extract_with_context(&self, _context: &PipelineContext) -> Result<Vec<Record>> {
        self.inner.extract().await
    }

    async fn transform_with_context(
        &self,
        data: Vec<Record>,
        _context: &PipelineContext,
    ) -> Result<TransformResult> {
        self.inner.transform(data).await
    }

    async fn load_with_context(
        &self,
        result: TransformResult,
        _context: &PipelineContext,
    ) -> Result<String> {
        self.inner.load(result).await
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn should_execute(&self, context: &PipelineContext) -> bool {
        match &self.requires {
            Some(stage) => context
                .get_result_by_name(stage)
                .map(|result| !result.records.is_empty())
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Runs audit pipelines strictly in order, threading the context through.
pub struct PipelineSequence {
    pipelines: Vec<Box<dyn ContextualPipeline>>,
    monitor: Option<SystemMonitor>,
    execution_id: String,
}

impl PipelineSequence {
    pub fn new(execution_id: String) -> Self {
        Self {
            pipelines: Vec::new(),
            monitor: None,
            execution_id,
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        if enabled {
            self.monitor = Some(SystemMonitor::new(enabled));
        }
        self
    }

    pub fn add_pipeline(&mut self, pipeline: Box<dyn ContextualPipeline>) {
        self.pipelines.push(pipeline);
    }

    pub async fn execute_all(&mut self) -> Result<Vec<PipelineResult>> {
        let mut results = Vec::new();
        let mut context = PipelineContext::new(self.execution_id.clone());

        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Audit sequence started");
        }

        for pipeline in &self.pipelines {
            let start_time = Instant::now();

            if !pipeline.should_execute(&context) {
                tracing::info!(
                    "⏭️ Skipping pipeline: {} (condition not met)",
                    pipeline.get_name()
                );
                continue;
            }

            match Self::execute_pipeline(pipeline.as_ref(), &context).await {
                Ok((records, output_path)) => {
                    let result = PipelineResult {
                        pipeline_name: pipeline.get_name().to_string(),
                        records,
                        output_path,
                        duration: start_time.elapsed(),
                        metadata: HashMap::new(),
                    };

                    tracing::info!(
                        "✅ Pipeline executed: {} (records: {}, duration: {:?})",
                        result.pipeline_name,
                        result.records.len(),
                        result.duration
                    );

                    context.add_result(result.clone());
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!("❌ Pipeline execution failed: {}", e);
                    return Err(AuditError::TransformationError {
                        stage: pipeline.get_name().to_string(),
                        details: format!("Pipeline execution failed: {}", e),
                    });
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Audit sequence completed");
            monitor.log_final_stats();
        }

        Ok(results)
    }

    async fn execute_pipeline(
        pipeline: &dyn ContextualPipeline,
        context: &PipelineContext,
    ) -> Result<(Vec<Record>, String)> {
        let records = pipeline.extract_with_context(context).await?;
        tracing::debug!("📥 Extracted {} records", records.len());

        let transform_result = pipeline.transform_with_context(records, context).await?;
        tracing::debug!(
            "🔄 Transformed {} records",
            transform_result.processed_records.len()
        );

        let output_path = pipeline
            .load_with_context(transform_result.clone(), context)
            .await?;
        tracing::debug!("💾 Loaded data to: {}", output_path);

        Ok((transform_result.processed_records, output_path))
    }

    /// Summary of an executed sequence, for the closing log line.
    pub fn get_execution_summary(results: &[PipelineResult]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_pipelines = results.len();
        let total_records: usize = results.iter().map(|r| r.records.len()).sum();
        let total_duration: std::time::Duration = results.iter().map(|r| r.duration).sum();

        summary.insert(
            "total_pipelines".to_string(),
            serde_json::Value::Number(total_pipelines.into()),
        );
        summary.insert(
            "total_records".to_string(),
            serde_json::Value::Number(total_records.into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let pipeline_names: Vec<serde_json::Value> = results
            .iter()
            .map(|r| serde_json::Value::String(r.pipeline_name.clone()))
            .collect();
        summary.insert(
            "executed_pipelines".to_string(),
            serde_json::Value::Array(pipeline_names),
        );

        summary
    }
}
