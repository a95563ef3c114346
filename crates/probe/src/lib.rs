//! Benchmarks one Ollama-compatible backend: reachability, the models it
//! currently serves, and each model's throughput.
//!
//! Grounded on the original's `test_endpoint`/`test_ai_model` pair
//! (`backend/src/ollama/performance_test.py`): version probe first, then
//! tag discovery, then one `/api/generate` benchmark per model, skipped
//! once the endpoint has already been classified `Fake`.

use std::time::{Duration, Instant};

use ollama_fleet_client::{GenerateResponse, OllamaClient, UpstreamError};
use ollama_fleet_config::constants::timeouts;
use ollama_fleet_core::{tokens::estimate_tokens, AiModelStatus, EndpointMeasurement, EndpointStatus, ModelMeasurement};
use futures::StreamExt;
use tracing::{debug, info};

/// Settings the probe needs that a caller must supply — the benchmark
/// prompt is a fixed constant, but the fake-marker list is configuration
/// (spec.md §9: appending a marker must not require a rebuild).
pub struct ProbeSettings<'a> {
    pub benchmark_prompt: &'a str,
    pub fake_markers: &'a [String],
}

/// Everything a single probe pass learned about one endpoint, ready to be
/// handed to the Store's `apply_probe_measurements` in one atomic update.
pub struct ProbeOutcome {
    pub endpoint: EndpointMeasurement,
    pub models: Vec<ModelMeasurement>,
}

/// Runs the full four-step algorithm against `base_url`.
pub async fn probe_endpoint(base_url: &str, settings: &ProbeSettings<'_>) -> ProbeOutcome {
    let client = match OllamaClient::new(base_url) {
        Ok(client) => client,
        Err(e) => {
            debug!("failed to build client for {base_url}: {e}");
            return ProbeOutcome {
                endpoint: EndpointMeasurement {
                    status: EndpointStatus::Unavailable,
                    ollama_version: None,
                },
                models: Vec::new(),
            };
        }
    };

    let version = tokio::time::timeout(
        Duration::from_secs(timeouts::VERSION_PROBE_SECS),
        client.version(),
    )
    .await;

    let ollama_version = match version {
        Ok(Ok(v)) => Some(v.version),
        Ok(Err(e)) => {
            debug!("version probe failed for {base_url}: {e}");
            return ProbeOutcome {
                endpoint: EndpointMeasurement {
                    status: EndpointStatus::Unavailable,
                    ollama_version: None,
                },
                models: Vec::new(),
            };
        }
        Err(_) => {
            debug!("version probe timed out for {base_url}");
            return ProbeOutcome {
                endpoint: EndpointMeasurement {
                    status: EndpointStatus::Unavailable,
                    ollama_version: None,
                },
                models: Vec::new(),
            };
        }
    };
    info!("endpoint {base_url} reports version {ollama_version:?}");

    let model_names = match client.tags().await {
        Ok(tags) => tags
            .models
            .into_iter()
            .filter_map(|tag| tag.model.split_once(':').map(|(n, t)| (n.to_string(), t.to_string())))
            .collect::<Vec<_>>(),
        Err(e) => {
            debug!("tag discovery failed for {base_url}: {e}");
            Vec::new()
        }
    };

    let mut endpoint_status = EndpointStatus::Available;
    let mut models = Vec::with_capacity(model_names.len());

    for (name, tag) in model_names {
        if endpoint_status == EndpointStatus::Fake {
            models.push(ModelMeasurement {
                name,
                tag,
                status: AiModelStatus::Fake,
                token_per_second: 0.0,
                connection_time: 0.0,
                total_time: 0.0,
                output: String::new(),
                output_tokens: 0,
            });
            continue;
        }

        let measurement = benchmark_model(&client, &name, &tag, settings).await;
        if measurement.status == AiModelStatus::Fake {
            endpoint_status = EndpointStatus::Fake;
        }
        models.push(measurement);
    }

    ProbeOutcome {
        endpoint: EndpointMeasurement {
            status: endpoint_status,
            ollama_version,
        },
        models,
    }
}

async fn benchmark_model(
    client: &OllamaClient,
    name: &str,
    tag: &str,
    settings: &ProbeSettings<'_>,
) -> ModelMeasurement {
    let model = format!("{name}:{tag}");
    let deadline = Duration::from_secs(timeouts::MODEL_BENCHMARK_SECS);
    let start = Instant::now();

    let run = async {
        let mut stream = Box::pin(client.generate(&model, settings.benchmark_prompt).await?);
        let mut output = String::new();
        let mut connection_time: Option<Duration> = None;
        let mut last: Option<GenerateResponse> = None;

        while let Some(chunk) = stream.next().await {
            if connection_time.is_none() {
                connection_time = Some(start.elapsed());
            }
            output.push_str(&chunk.response);
            if settings.fake_markers.iter().any(|marker| output.contains(marker)) {
                return Ok::<_, UpstreamError>(BenchmarkRun::Fake);
            }
            let done = chunk.done;
            last = Some(chunk);
            if done {
                break;
            }
        }

        match last {
            Some(last) => Ok(BenchmarkRun::Completed {
                output,
                connection_time: connection_time.unwrap_or_else(|| start.elapsed()),
                eval_count: last.eval_count,
            }),
            None => Ok(BenchmarkRun::NoResponse),
        }
    };

    let outcome = tokio::time::timeout(deadline, run).await;
    let total_time = start.elapsed();

    match outcome {
        Ok(Ok(BenchmarkRun::Fake)) => {
            debug!("fake endpoint detected while probing {model}");
            ModelMeasurement {
                name: name.to_string(),
                tag: tag.to_string(),
                status: AiModelStatus::Fake,
                token_per_second: 0.0,
                connection_time: 0.0,
                total_time: 0.0,
                output: String::new(),
                output_tokens: 0,
            }
        }
        Ok(Ok(BenchmarkRun::Completed {
            output,
            connection_time,
            eval_count,
        })) => {
            let output_tokens = eval_count.unwrap_or_else(|| estimate_tokens(&output));
            let total_secs = total_time.as_secs_f64();
            let token_per_second = if total_secs > 0.0 {
                output_tokens as f64 / total_secs
            } else {
                0.0
            };
            ModelMeasurement {
                name: name.to_string(),
                tag: tag.to_string(),
                status: AiModelStatus::Available,
                token_per_second,
                connection_time: connection_time.as_secs_f64(),
                total_time: total_secs,
                output,
                output_tokens,
            }
        }
        Ok(Ok(BenchmarkRun::NoResponse)) | Ok(Err(_)) | Err(_) => {
            debug!("model {model} unavailable on this probe pass");
            ModelMeasurement {
                name: name.to_string(),
                tag: tag.to_string(),
                status: AiModelStatus::Unavailable,
                token_per_second: 0.0,
                connection_time: 0.0,
                total_time: 0.0,
                output: String::new(),
                output_tokens: 0,
            }
        }
    }
}

enum BenchmarkRun {
    Fake,
    NoResponse,
    Completed {
        output: String,
        connection_time: Duration,
        eval_count: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ProbeSettings<'static> {
        ProbeSettings {
            benchmark_prompt: "hello",
            fake_markers: &[],
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let outcome = probe_endpoint("http://127.0.0.1:1", &settings()).await;
        assert_eq!(outcome.endpoint.status, EndpointStatus::Unavailable);
        assert!(outcome.models.is_empty());
    }

    #[tokio::test]
    async fn healthy_endpoint_with_no_models_reports_available_and_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;

        let outcome = probe_endpoint(&server.uri(), &settings()).await;
        assert_eq!(outcome.endpoint.status, EndpointStatus::Available);
        assert_eq!(outcome.endpoint.ollama_version.as_deref(), Some("0.5.1"));
        assert!(outcome.models.is_empty());
    }

    #[tokio::test]
    async fn model_reporting_fake_marker_flags_model_and_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"model": "llama3:8b"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"response\":\"fake-ollama\",\"done\":true,\"eval_count\":3}\n",
                "application/x-ndjson",
            ))
            .mount(&server)
            .await;

        let markers = vec!["fake-ollama".to_string()];
        let marker_settings = ProbeSettings {
            benchmark_prompt: "hello",
            fake_markers: &markers,
        };
        let outcome = probe_endpoint(&server.uri(), &marker_settings).await;
        assert_eq!(outcome.endpoint.status, EndpointStatus::Fake);
        assert_eq!(outcome.models.len(), 1);
        assert_eq!(outcome.models[0].status, AiModelStatus::Fake);
    }

    #[tokio::test]
    async fn model_with_real_response_reports_throughput() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"model": "llama3:8b"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"response\":\"hi there\",\"done\":true,\"eval_count\":5}\n",
                "application/x-ndjson",
            ))
            .mount(&server)
            .await;

        let outcome = probe_endpoint(&server.uri(), &settings()).await;
        assert_eq!(outcome.models.len(), 1);
        let model = &outcome.models[0];
        assert_eq!(model.status, AiModelStatus::Available);
        assert_eq!(model.output_tokens, 5);
        assert!(model.token_per_second > 0.0);
    }
}
