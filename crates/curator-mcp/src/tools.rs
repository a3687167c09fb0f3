//! MCP tool definitions and request handling
//!
//! This module defines all available tools and handles MCP protocol messages.

use std::sync::Arc;

use curator_core::ContentRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::accounts::AccountService;
use crate::error::{validate_account_name, validate_limit, validate_topic};
use crate::trends::TrendAggregator;

const SERVER_NAME: &str = "curator-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// MCP Protocol Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent on notifications
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn name_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "Curator account name (case-insensitive)" }
        },
        "required": ["name"]
    })
}

// =============================================================================
// Argument helpers
// =============================================================================

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args[key]
        .as_str()
        .ok_or_else(|| format!("Missing {} parameter", key))
}

fn account_arg<'a>(args: &'a Value) -> Result<&'a str, String> {
    let name = str_arg(args, "name")?;
    validate_account_name(name).map_err(|e| e.to_string())?;
    Ok(name)
}

fn topic_arg<'a>(args: &'a Value) -> Result<&'a str, String> {
    let topic = str_arg(args, "topic")?;
    validate_topic(topic).map_err(|e| e.to_string())?;
    Ok(topic)
}

fn limit_arg(args: &Value, default: u64) -> Result<usize, String> {
    validate_limit(args["limit"].as_u64().unwrap_or(default)).map_err(|e| e.to_string())
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

// =============================================================================
// Curator Tools
// =============================================================================

/// Tool handler over the account service and the trend aggregator
pub struct CuratorTools {
    accounts: Arc<AccountService>,
    trends: Arc<TrendAggregator>,
}

impl CuratorTools {
    pub fn new(accounts: Arc<AccountService>, trends: Arc<TrendAggregator>) -> Self {
        Self { accounts, trends }
    }

    /// Get all available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        vec![
            tool(
                "curator_health",
                "Check the health of the curator service: snapshot cache, tracked vocabulary and today's date.",
                json!({ "type": "object", "properties": {}, "required": [] }),
            ),
            // Accounts
            tool(
                "get_content_account",
                "Get a content account: credit balance, strategy, content history and aggregates. Creates the account on first access.",
                name_only_schema(),
            ),
            tool(
                "get_content_account_report",
                "Get a detailed account report with engagement totals, platform performance and top topics. Records an engagement observation.",
                name_only_schema(),
            ),
            tool(
                "get_content_strategy",
                "Get the content strategy of an account.",
                name_only_schema(),
            ),
            tool(
                "create_content",
                "Create content for a topic on a platform. Costs one credit; engagement is derived from today's trend score and the platform.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "topic": { "type": "string", "description": "Topic of the content" },
                        "platform": {
                            "type": "string",
                            "description": "Publishing platform (twitter, linkedin, blog, newsletter)"
                        },
                        "content_type": { "type": "string", "description": "Kind of content, e.g. article or thread" },
                        "rationale": { "type": "string", "description": "Why this content fits the strategy" }
                    },
                    "required": ["name", "topic", "platform", "content_type", "rationale"]
                }),
            ),
            tool(
                "skip_content",
                "Record a decision not to create content for a topic.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "topic": { "type": "string", "description": "Skipped topic" },
                        "rationale": { "type": "string", "description": "Why it was skipped" }
                    },
                    "required": ["name", "topic", "rationale"]
                }),
            ),
            tool(
                "promote_content",
                "Promote existing content on a topic to a new platform. Requires prior content on the topic and costs one credit.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "topic": { "type": "string", "description": "Topic already covered by the account" },
                        "platform": { "type": "string", "description": "Target platform" },
                        "rationale": { "type": "string", "description": "Why the promotion is worthwhile" }
                    },
                    "required": ["name", "topic", "platform", "rationale"]
                }),
            ),
            tool(
                "get_content_performance_analysis",
                "Get per-platform and per-topic performance rollups computed from the content history.",
                name_only_schema(),
            ),
            tool(
                "get_recent_content",
                "Get content created in the last N days.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "days": { "type": "integer", "description": "Window in days (default: 7)" }
                    },
                    "required": ["name"]
                }),
            ),
            tool(
                "add_content_credits",
                "Add credits to a content account.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "amount": { "type": "number", "description": "Positive number of credits" }
                    },
                    "required": ["name", "amount"]
                }),
            ),
            tool(
                "change_content_strategy",
                "Change the content strategy of an account.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "strategy": { "type": "string", "description": "New strategy" }
                    },
                    "required": ["name", "strategy"]
                }),
            ),
            tool(
                "reset_content_account",
                "Reset an account: credits back to the initial allocation, history and aggregates cleared, new strategy set. Cannot be undone.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "strategy": { "type": "string", "description": "Strategy after the reset" }
                    },
                    "required": ["name", "strategy"]
                }),
            ),
            tool(
                "get_top_performing_topics",
                "Get the most covered topics of an account by content count.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "limit": { "type": "integer", "description": "Maximum topics (default: 5, max: 100)" }
                    },
                    "required": ["name"]
                }),
            ),
            tool(
                "get_platform_performance",
                "Get average engagement per post for each platform.",
                name_only_schema(),
            ),
            tool(
                "get_account_log",
                "Get the most recent operational log entries of an account, oldest first.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Curator account name" },
                        "limit": { "type": "integer", "description": "Number of entries (default: 10, max: 100)" }
                    },
                    "required": ["name"]
                }),
            ),
            // Trends
            tool(
                "get_trend_score",
                "Get today's trend score (0-100) for a topic.",
                json!({
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string", "description": "Topic to score" }
                    },
                    "required": ["topic"]
                }),
            ),
            tool(
                "get_top_trends",
                "Get today's top trending AI topics with scores and per-source values.",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": { "type": "integer", "description": "At most this many results (default: 10, max: 100)" }
                    },
                    "required": []
                }),
            ),
            tool(
                "get_ai_keywords",
                "Get the AI keywords being tracked for trends.",
                json!({ "type": "object", "properties": {}, "required": [] }),
            ),
            tool(
                "search_trending_by_keyword",
                "Search today's trending topics containing a keyword.",
                json!({
                    "type": "object",
                    "properties": {
                        "keyword": { "type": "string", "description": "Case-insensitive keyword" },
                        "limit": { "type": "integer", "description": "Maximum results (default: 5, max: 100)" }
                    },
                    "required": ["keyword"]
                }),
            ),
            tool(
                "get_trend_sources_breakdown",
                "Get the contribution of each trend source across today's top topics.",
                json!({ "type": "object", "properties": {}, "required": [] }),
            ),
            tool(
                "evaluate_content_opportunity",
                "Evaluate a content opportunity from the topic's trend score and platform fit.",
                json!({
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string", "description": "Candidate topic" },
                        "platform": { "type": "string", "description": "Candidate platform" }
                    },
                    "required": ["topic", "platform"]
                }),
            ),
            tool(
                "get_content_timing_recommendation",
                "Get a timing recommendation for content on a topic based on its trend score.",
                json!({
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string", "description": "Candidate topic" }
                    },
                    "required": ["topic"]
                }),
            ),
            tool(
                "compare_topic_trends",
                "Compare trend scores for several topics, highest first.",
                json!({
                    "type": "object",
                    "properties": {
                        "topics": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Topics to compare"
                        }
                    },
                    "required": ["topics"]
                }),
            ),
        ]
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> Result<Value, String> {
        match name {
            "curator_health" => {
                let cache = self.trends.cache_stats();
                Ok(json!({
                    "status": "healthy",
                    "version": SERVER_VERSION,
                    "snapshot_cache": { "cached_dates": cache.entry_count },
                    "tracked_keywords": self.trends.vocabulary().len()
                }))
            }

            // Accounts
            "get_content_account" => {
                let name = account_arg(args)?;
                to_value(self.accounts.get_account(name).await.map_err(|e| e.to_string())?)
            }

            "get_content_account_report" => {
                let name = account_arg(args)?;
                to_value(self.accounts.report(name).await.map_err(|e| e.to_string())?)
            }

            "get_content_strategy" => {
                let name = account_arg(args)?;
                let strategy = self.accounts.get_strategy(name).await.map_err(|e| e.to_string())?;
                Ok(json!({ "name": name, "strategy": strategy }))
            }

            "create_content" => {
                let name = account_arg(args)?;
                let request = ContentRequest::new(
                    topic_arg(args)?,
                    str_arg(args, "platform")?,
                    str_arg(args, "content_type")?,
                    str_arg(args, "rationale")?,
                );
                let piece = self
                    .accounts
                    .create_content(name, request)
                    .await
                    .map_err(|e| e.to_string())?;
                let account = self.accounts.get_account(name).await.map_err(|e| e.to_string())?;
                Ok(json!({
                    "content": piece,
                    "credits_remaining": account.credits.balance()
                }))
            }

            "skip_content" => {
                let name = account_arg(args)?;
                let topic = topic_arg(args)?;
                let rationale = str_arg(args, "rationale")?;
                self.accounts.skip_content(name, topic, rationale);
                Ok(json!({ "skipped": topic, "rationale": rationale }))
            }

            "promote_content" => {
                let name = account_arg(args)?;
                let topic = topic_arg(args)?;
                let platform = str_arg(args, "platform")?;
                let rationale = str_arg(args, "rationale")?;
                let piece = self
                    .accounts
                    .promote_content(name, topic, platform, rationale)
                    .await
                    .map_err(|e| e.to_string())?;
                to_value(piece)
            }

            "get_content_performance_analysis" => {
                let name = account_arg(args)?;
                to_value(self.accounts.analyze(name).await.map_err(|e| e.to_string())?)
            }

            "get_recent_content" => {
                let name = account_arg(args)?;
                let days = args["days"].as_i64().unwrap_or(7);
                if days < 0 {
                    return Err(format!("Invalid days {}. Must not be negative", days));
                }
                to_value(
                    self.accounts
                        .recent_content(name, days)
                        .await
                        .map_err(|e| e.to_string())?,
                )
            }

            "add_content_credits" => {
                let name = account_arg(args)?;
                let amount = args["amount"].as_f64().ok_or("Missing amount parameter")?;
                let balance = self
                    .accounts
                    .add_credits(name, amount)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "added": amount, "credits": balance }))
            }

            "change_content_strategy" => {
                let name = account_arg(args)?;
                let strategy = str_arg(args, "strategy")?;
                self.accounts
                    .change_strategy(name, strategy)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "name": name, "strategy": strategy }))
            }

            "reset_content_account" => {
                let name = account_arg(args)?;
                let strategy = str_arg(args, "strategy")?;
                self.accounts
                    .reset_account(name, strategy)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({ "reset": name, "strategy": strategy }))
            }

            "get_top_performing_topics" => {
                let name = account_arg(args)?;
                let limit = limit_arg(args, 5)?;
                to_value(
                    self.accounts
                        .top_topics(name, limit)
                        .await
                        .map_err(|e| e.to_string())?,
                )
            }

            "get_platform_performance" => {
                let name = account_arg(args)?;
                to_value(
                    self.accounts
                        .platform_performance(name)
                        .await
                        .map_err(|e| e.to_string())?,
                )
            }

            "get_account_log" => {
                let name = account_arg(args)?;
                let limit = limit_arg(args, 10)?;
                to_value(self.accounts.read_log(name, limit).map_err(|e| e.to_string())?)
            }

            // Trends
            "get_trend_score" => {
                let topic = topic_arg(args)?;
                let score = self.trends.score_for_topic(topic).await;
                Ok(json!({ "topic": topic, "score": score }))
            }

            "get_top_trends" => {
                // "at most limit": zero is a valid, empty request
                let limit = match args["limit"].as_u64().unwrap_or(10) {
                    0 => 0,
                    n => validate_limit(n).map_err(|e| e.to_string())?,
                };
                to_value(self.trends.top_trending(limit).await.map_err(|e| e.to_string())?)
            }

            "get_ai_keywords" => {
                let keywords = self.trends.vocabulary();
                Ok(json!({
                    "keywords": keywords,
                    "total_count": keywords.len()
                }))
            }

            "search_trending_by_keyword" => {
                let keyword = str_arg(args, "keyword")?;
                let limit = limit_arg(args, 5)?;
                let matching = self
                    .trends
                    .search(keyword, limit)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(json!({
                    "keyword": keyword,
                    "count": matching.len(),
                    "matching_trends": matching
                }))
            }

            "get_trend_sources_breakdown" => {
                let breakdown = self.trends.source_breakdown().await.map_err(|e| e.to_string())?;
                let total = self.trends.top_trending(20).await.map_err(|e| e.to_string())?.len();
                Ok(json!({
                    "source_breakdown": breakdown,
                    "total_trending_topics": total
                }))
            }

            "evaluate_content_opportunity" => {
                let topic = topic_arg(args)?;
                let platform = str_arg(args, "platform")?;
                to_value(self.trends.evaluate_opportunity(topic, platform).await)
            }

            "get_content_timing_recommendation" => {
                let topic = topic_arg(args)?;
                to_value(self.trends.timing_recommendation(topic).await)
            }

            "compare_topic_trends" => {
                let topics: Vec<String> = args["topics"]
                    .as_array()
                    .ok_or("Missing topics parameter")?
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect();
                if topics.is_empty() {
                    return Err("At least one topic is required".to_string());
                }
                to_value(self.trends.compare_topics(&topics).await)
            }

            _ => Err(format!("Unknown tool: {}", name)),
        }
    }
}

// =============================================================================
// MCP Protocol Handlers
// =============================================================================

fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        }
    })
}

fn handle_list_tools(tools: &CuratorTools) -> Value {
    json!({
        "tools": tools.get_tools()
    })
}

async fn handle_call_tool(tools: &CuratorTools, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match tools.execute(name, args).await {
        Ok(result) => {
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                }]
            })
        }
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })
        }
    }
}

/// Handle an incoming MCP request
pub async fn handle_request(
    tools: &CuratorTools,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    if request.method.starts_with("notifications/") {
        return None;
    }

    let result = match request.method.as_str() {
        "initialize" => Some(handle_initialize(&request.params)),
        "initialized" => None,
        "ping" => Some(json!({})),
        "tools/list" => Some(handle_list_tools(tools)),
        "tools/call" => Some(handle_call_tool(tools, &request.params).await),
        _ => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            });
        }
    };

    result.map(|r| JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result: Some(r),
        error: None,
    })
}
