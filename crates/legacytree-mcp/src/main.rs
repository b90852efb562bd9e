use chrono::NaiveDate;
use legacytree_core::storage::{template, TEMPLATES};
use legacytree_core::{
    Backfill, ExpansionState, FamilyTree, FileSink, Gender, Library, NewPerson, RelationType,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CreateTreeRequest {
    /// Name of the new tree. Letters, digits, '-' and '_' only.
    name: String,
    /// Seed template: "empty" (default) or "harrison" (a 12-person demo family)
    template: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct TreeRequest {
    /// Name of the tree
    name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct PersonRequest {
    /// Name of the tree
    tree: String,
    /// ID of the person
    person_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddPersonRequest {
    /// Name of the tree
    tree: String,
    /// Full name of the new person
    name: String,
    /// Birth date, YYYY-MM-DD
    birth_date: String,
    /// Male, Female or Other (default)
    gender: Option<Gender>,
    /// Death date, YYYY-MM-DD. Omit for living people.
    death_date: Option<String>,
    /// Short biography
    bio: Option<String>,
    /// Portrait URL. A placeholder is used when omitted.
    main_image: Option<String>,
    /// How the new person relates to the target: CHILD (default), SPOUSE, PARENT or SIBLING
    relation: Option<RelationType>,
    /// Existing person to add relative to. Omit to start a separate lineage.
    target_id: Option<String>,
    /// PARENT only: the people who become the target's siblings under the new parent. When omitted, every other parentless lineage member is adopted.
    siblings: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct CanMutateRequest {
    /// Name of the tree
    tree: String,
    /// Person the change would be made at. Omit to ask about adding a new root.
    target_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct LayoutRequest {
    /// Name of the tree
    name: String,
    /// Expand every person before laying out. The stored view is left unchanged.
    expand_all: Option<bool>,
}

// --- Server ---

#[derive(Clone)]
pub struct LegacyTreeServer {
    tool_router: ToolRouter<Self>,
    library: Library,
    /// Expanded ids per tree, for the lifetime of the server.
    views: Arc<Mutex<HashMap<String, ExpansionState>>>,
}

#[tool_router]
impl LegacyTreeServer {
    pub fn new(library: Library) -> Self {
        Self {
            tool_router: Self::tool_router(),
            library,
            views: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[tool(description = "List all saved family trees")]
    fn list_trees(&self) -> Result<CallToolResult, McpError> {
        match self.library.list_trees() {
            Ok(names) => {
                let text = if names.is_empty() {
                    "No trees found. Use create_tree to start one.".to_string()
                } else {
                    names.join("\n")
                };
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => failure(e),
        }
    }

    #[tool(description = "List the templates create_tree can seed a tree from")]
    fn list_templates(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(TEMPLATES.join("\n"))]))
    }

    #[tool(description = "Create a new family tree, optionally seeded from a template. Fails if a tree with that name already exists.")]
    fn create_tree(
        &self,
        Parameters(req): Parameters<CreateTreeRequest>,
    ) -> Result<CallToolResult, McpError> {
        if self.library.tree_exists(&req.name) {
            return failure(format!("Tree '{}' already exists", req.name));
        }
        let seed = req.template.as_deref().unwrap_or("empty");
        let people = match template(seed) {
            Ok(p) => p,
            Err(e) => return failure(e),
        };
        if let Err(e) = self.library.write_tree(&req.name, &people) {
            return failure(e);
        }
        self.views_mut().remove(&req.name);
        tracing::info!(tree = %req.name, template = seed, people = people.len(), "created tree");
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Created '{}' with {} people",
            req.name,
            people.len()
        ))]))
    }

    #[tool(
        description = "Get every person in a tree as JSON: [{id, name, gender, birthDate, deathDate?, bio, mainImage, gallery, parentId?, spouseId?}]"
    )]
    fn get_tree(&self, Parameters(req): Parameters<TreeRequest>) -> Result<CallToolResult, McpError> {
        match self.library.read_tree(&req.name) {
            Ok(people) => json_result(&people),
            Err(e) => failure(format!("Failed to read tree '{}': {}", req.name, e)),
        }
    }

    #[tool(
        description = "Get one person with their immediate family: {person, lifespan, parent?, spouse?, children: [id]}"
    )]
    fn get_person(
        &self,
        Parameters(req): Parameters<PersonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.tree) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        let Some(person) = tree.person_by_id(&req.person_id) else {
            return failure(format!("Person '{}' not found", req.person_id));
        };
        let store = tree.store();
        let children: Vec<&str> = store.children_of(&person.id).map(|c| c.id.as_str()).collect();
        json_result(&serde_json::json!({
            "person": person,
            "lifespan": person.lifespan(),
            "parent": person.parent_id.as_deref().and_then(|id| store.get(id)),
            "spouse": store.spouse_of(&person.id),
            "children": children,
        }))
    }

    #[tool(
        description = "Add a person relative to an existing one. CHILD: the target becomes the parent. SPOUSE: both are linked; the target must be unmarried. PARENT: the target must have no parent; other parentless lineage members (or only `siblings`, if given) become the target's siblings. SIBLING: shares the target's parent. Without target_id the person starts a separate lineage. Requires edit permission for the target (see can_mutate)."
    )]
    fn add_person(
        &self,
        Parameters(req): Parameters<AddPersonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let birth_date = match parse_date("birth_date", &req.birth_date) {
            Ok(d) => d,
            Err(msg) => return failure(msg),
        };
        let death_date = match req.death_date.as_deref().map(|d| parse_date("death_date", d)).transpose() {
            Ok(d) => d,
            Err(msg) => return failure(msg),
        };
        let mut tree = match self.open(&req.tree) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };

        let fields = NewPerson {
            name: req.name,
            gender: req.gender,
            birth_date: Some(birth_date),
            death_date,
            bio: req.bio,
            main_image: req.main_image,
        };
        let backfill = req.siblings.map_or(Backfill::Rootless, Backfill::Only);
        let actor = self.library.read_settings().actor;
        let added = match tree.add_person(
            &actor,
            fields,
            req.relation.unwrap_or(RelationType::Child),
            req.target_id.as_deref(),
            backfill,
        ) {
            Ok(a) => a,
            Err(e) => return failure(e),
        };

        self.views_mut()
            .entry(req.tree.clone())
            .or_default()
            .reveal(tree.store(), &added.id);
        json_result(&added)
    }

    #[tool(description = "Check whether the configured role may add people at a target. Returns {role, targetId?, allowed}.")]
    fn can_mutate(
        &self,
        Parameters(req): Parameters<CanMutateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.tree) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        let actor = self.library.read_settings().actor;
        json_result(&PermissionAnswer {
            allowed: tree.can_mutate(&actor, req.target_id.as_deref()),
            role: actor.role.to_string(),
            target_id: req.target_id,
        })
    }

    #[tool(description = "Expand or collapse a person in the tree view. Expanding shows their spouse and children.")]
    fn toggle_node(
        &self,
        Parameters(req): Parameters<PersonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.tree) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        if tree.person_by_id(&req.person_id).is_none() {
            return failure(format!("Person '{}' not found", req.person_id));
        }
        let expanded = self
            .views_mut()
            .entry(req.tree)
            .or_default()
            .toggle(&req.person_id);
        let verb = if expanded { "Expanded" } else { "Collapsed" };
        Ok(CallToolResult::success(vec![Content::text(format!(
            "{} '{}'",
            verb, req.person_id
        ))]))
    }

    #[tool(description = "Expand the ancestors of a person so they are visible in the tree view")]
    fn reveal_person(
        &self,
        Parameters(req): Parameters<PersonRequest>,
    ) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.tree) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        if tree.person_by_id(&req.person_id).is_none() {
            return failure(format!("Person '{}' not found", req.person_id));
        }
        self.views_mut()
            .entry(req.tree)
            .or_default()
            .reveal(tree.store(), &req.person_id);
        Ok(CallToolResult::success(vec![Content::text(format!(
            "'{}' is now visible",
            req.person_id
        ))]))
    }

    #[tool(
        description = "Lay out the tree as currently expanded. Returns {state: \"empty\"} or {state: \"drawn\", nodes: [{id, x, y, kind, expanded, togglable, partnerId?}], edges: [{from, to, kind, points}]}. Coordinates are card centers; y grows downward one row per generation."
    )]
    fn get_layout(
        &self,
        Parameters(req): Parameters<LayoutRequest>,
    ) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.name) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        let mut state = {
            let mut views = self.views_mut();
            let view = views.entry(req.name.clone()).or_default();
            view.retain_existing(tree.store());
            view.clone()
        };
        if req.expand_all.unwrap_or(false) {
            state.expand_all(tree.store());
        }
        match tree.render(&state) {
            Ok(scene) => json_result(&scene),
            Err(e) => failure(format!("Cannot lay out '{}': {}", req.name, e)),
        }
    }

    #[tool(description = "Check a tree for broken links: dangling parents or spouses, self-references, one-sided marriages and parent cycles")]
    fn check_tree(&self, Parameters(req): Parameters<TreeRequest>) -> Result<CallToolResult, McpError> {
        let tree = match self.open(&req.name) {
            Ok(t) => t,
            Err(msg) => return failure(msg),
        };
        let issues = tree.integrity_issues();
        if issues.is_empty() {
            Ok(CallToolResult::success(vec![Content::text("No issues found.")]))
        } else {
            json_result(&issues)
        }
    }

    #[tool(description = "Get the rules that govern how family trees are edited")]
    fn get_rules(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            legacytree_core::rules::RULES,
        )]))
    }
}

#[tool_handler]
impl ServerHandler for LegacyTreeServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "{}\n\n## Editing Rules\n{}",
            INSTRUCTIONS,
            legacytree_core::rules::RULES
        );
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

impl LegacyTreeServer {
    fn open(&self, name: &str) -> Result<FamilyTree<FileSink>, String> {
        let people = self
            .library
            .read_tree(name)
            .map_err(|e| format!("Failed to read tree '{}': {}", name, e))?;
        let layout = self.library.read_settings().layout;
        let tree = FamilyTree::load(people, FileSink::new(self.library.clone(), name))
            .map_err(|e| format!("Tree '{}' is invalid: {}", name, e))?;
        Ok(tree.with_config(layout))
    }

    fn views_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, ExpansionState>> {
        self.views.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionAnswer {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_id: Option<String>,
    allowed: bool,
}

fn failure(msg: impl ToString) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.to_string())]))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("Serialization error: {}", e));
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{} must be a date like 1948-03-15, got '{}'", field, raw))
}

const INSTRUCTIONS: &str = r#"legacytree manages family trees stored as JSON files in ~/.legacytree/ (or $LEGACYTREE_HOME).

## Records
Each person has an id, name, gender, birthDate, optional deathDate, bio, mainImage and gallery, plus two links: `parentId` (the one parent the line runs through) and `spouseId` (always mirrored on both partners).

## Workflow
1. `list_trees` or `create_tree` (seed with `list_templates`).
2. Inspect with `get_tree` or `get_person`.
3. Before editing, call `can_mutate` for the target. The role comes from settings.json.
4. `add_person` with a relation and target. The new person is revealed in the view automatically.
5. `get_layout` returns card positions for the current view. `toggle_node` and `reveal_person` change what is expanded.
6. After larger edits run `check_tree`."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legacytree_core=info,legacytree_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let library = Library::open_default();
    tracing::info!(root = %library.root().display(), "serving family trees");

    let service = LegacyTreeServer::new(library)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
