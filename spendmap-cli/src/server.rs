//! Dashboard web server
//!
//! Serves a single page and one JSON route per dashboard callback. The page
//! posts the current control values and redraws whatever comes back.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Result;
use chrono::NaiveDate;
use log::error;
use rocket::http::Status;
use rocket::serde::json::{Json, Value};
use rocket::{get, post, response::content::RawHtml, routes, Build, Config, Rocket, State};
use serde::{Deserialize, Serialize};

use spendmap_core::config::Config as SpendmapConfig;
use spendmap_core::domain::parse_timestamp;
use spendmap_core::services::{
    AmountRange, AmountWindow, DashboardService, DateWindow, Layout, MapSelection, TableRow,
};

const LISTEN_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

type TokenSource = Box<dyn Fn() -> Option<String> + Send + Sync>;

struct ServerState {
    service: DashboardService,
    map_token: TokenSource,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiResult<T> = std::result::Result<Json<T>, (Status, Json<ErrorBody>)>;

fn api_error(status: Status, message: impl Into<String>) -> (Status, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Control values sent by the page
#[derive(Debug, Deserialize)]
struct ControlState {
    start_date: String,
    end_date: String,
    /// Amount slider; absent means the full range for the dates
    #[serde(default)]
    value: Option<[f64; 2]>,
    #[serde(default)]
    selected_points: Option<MapSelection>,
}

impl ControlState {
    fn dates(&self) -> std::result::Result<DateWindow, (Status, Json<ErrorBody>)> {
        let parse = |raw: &str| {
            parse_timestamp(raw).map_err(|e| api_error(Status::BadRequest, e.to_string()))
        };
        let start = parse(&self.start_date)?;
        // A bare end date covers that whole day
        let end = match NaiveDate::parse_from_str(self.end_date.trim(), "%Y-%m-%d") {
            Ok(day) => day
                .and_hms_nano_opt(23, 59, 59, 999_999_999)
                .ok_or_else(|| {
                    api_error(Status::BadRequest, format!("Invalid end date {:?}", self.end_date))
                })?,
            Err(_) => parse(&self.end_date)?,
        };
        Ok(DateWindow::new(start, end))
    }

    fn amounts(&self, service: &DashboardService, dates: &DateWindow) -> Option<AmountWindow> {
        self.value
            .or_else(|| service.amount_value(dates))
            .map(AmountWindow::from)
    }
}

/// Build the server for a loaded dashboard, reading the map token per request
pub fn build_rocket(service: DashboardService, port: u16) -> Rocket<Build> {
    build_rocket_with(service, port, Box::new(SpendmapConfig::map_token))
}

fn build_rocket_with(service: DashboardService, port: u16, map_token: TokenSource) -> Rocket<Build> {
    rocket::custom(Config {
        log_level: rocket::config::LogLevel::Critical,
        address: LISTEN_ADDR,
        port,
        ..Default::default()
    })
    .manage(ServerState { service, map_token })
    .mount(
        "/",
        routes![index, layout, amount_range, table, pie, map],
    )
}

/// Serve until shut down
pub async fn serve(service: DashboardService, port: u16) -> Result<()> {
    build_rocket(service, port).launch().await?;
    Ok(())
}

#[get("/")]
fn index() -> RawHtml<&'static str> {
    RawHtml(INDEX_HTML)
}

#[get("/api/layout")]
fn layout(state: &State<ServerState>) -> Json<Layout> {
    Json(state.service.layout())
}

#[post("/api/amount-range", format = "json", data = "<controls>")]
fn amount_range(
    controls: Json<ControlState>,
    state: &State<ServerState>,
) -> ApiResult<Option<AmountRange>> {
    let dates = controls.dates()?;
    Ok(Json(state.service.amount_range(&dates)))
}

#[post("/api/table", format = "json", data = "<controls>")]
fn table(controls: Json<ControlState>, state: &State<ServerState>) -> ApiResult<Vec<TableRow>> {
    let dates = controls.dates()?;
    let rows = match controls.amounts(&state.service, &dates) {
        Some(amounts) => state.service.table_rows(&dates, &amounts),
        None => Vec::new(),
    };
    Ok(Json(rows))
}

#[post("/api/pie", format = "json", data = "<controls>")]
fn pie(controls: Json<ControlState>, state: &State<ServerState>) -> ApiResult<Value> {
    let dates = controls.dates()?;
    let amounts = controls
        .amounts(&state.service, &dates)
        .unwrap_or(AmountWindow::new(0.0, 0.0));
    Ok(Json(state.service.pie_figure(
        &dates,
        &amounts,
        controls.selected_points.as_ref(),
    )))
}

#[post("/api/map", format = "json", data = "<controls>")]
fn map(controls: Json<ControlState>, state: &State<ServerState>) -> ApiResult<Value> {
    let dates = controls.dates()?;
    let amounts = controls
        .amounts(&state.service, &dates)
        .unwrap_or(AmountWindow::new(0.0, 0.0));
    let token = (state.map_token)();

    state
        .service
        .map_figure(&dates, &amounts, token.as_deref())
        .map(Json)
        .map_err(|e| {
            error!("Map render failed: {}", e);
            api_error(Status::InternalServerError, e.to_string())
        })
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>spendmap</title>
    <script src="https://cdn.plot.ly/plotly-2.27.0.min.js"></script>
    <style>
        body { font-family: sans-serif; margin: 1em 2em; }
        .controls { display: flex; gap: 2em; align-items: center; margin-bottom: 1em; }
        .charts { display: flex; gap: 1em; }
        .charts > div { flex: 1; height: 450px; }
        table { border-collapse: collapse; width: 100%; margin-top: 1em; }
        th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: left; }
        #table-wrap { max-height: 400px; overflow-y: auto; }
    </style>
</head>
<body>
    <h1>Where does the money go?</h1>
    <div class="controls">
        <label>From <input type="date" id="start-date"></label>
        <label>To <input type="date" id="end-date"></label>
        <label>Amount
            <input type="range" id="amount-low" step="50" list="amount-marks">
            <input type="range" id="amount-high" step="50" list="amount-marks">
            <span id="amount-label"></span>
        </label>
        <datalist id="amount-marks"></datalist>
    </div>
    <div class="charts">
        <div id="pie"></div>
        <div id="map"></div>
    </div>
    <div id="map-error"></div>
    <input type="search" id="table-filter" placeholder="Filter rows">
    <div id="table-wrap">
        <table>
            <thead><tr>
                <th data-key="created">created</th><th data-key="amount">amount</th>
                <th data-key="category">category</th><th data-key="description">description</th>
            </tr></thead>
            <tbody id="rows"></tbody>
        </table>
    </div>
    <script>
        const el = (id) => document.getElementById(id);
        let selectedPoints = null;
        let tableRows = [];
        let sortKey = null;
        let sortAsc = true;

        async function post(path, body) {
            const res = await fetch(path, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify(body),
            });
            return { ok: res.ok, body: await res.json() };
        }

        function controls() {
            return {
                start_date: el('start-date').value,
                end_date: el('end-date').value,
                value: [Number(el('amount-low').value), Number(el('amount-high').value)],
            };
        }

        function renderRows(rows) {
            if (rows) tableRows = rows;
            const needle = el('table-filter').value.toLowerCase();
            let shown = tableRows.filter(r =>
                !needle || Object.values(r).some(v => String(v).toLowerCase().includes(needle)));
            if (sortKey) {
                shown = [...shown].sort((a, b) =>
                    (a[sortKey] < b[sortKey] ? -1 : a[sortKey] > b[sortKey] ? 1 : 0) * (sortAsc ? 1 : -1));
            }
            const body = el('rows');
            body.replaceChildren(...shown.map(r => {
                const tr = document.createElement('tr');
                for (const key of ['created', 'amount', 'category', 'description']) {
                    const td = document.createElement('td');
                    td.textContent = r[key];
                    tr.appendChild(td);
                }
                return tr;
            }));
        }

        async function refreshCharts() {
            const state = controls();
            el('amount-label').textContent = `${state.value[0]} to ${state.value[1]}`;

            renderRows((await post('/api/table', state)).body);

            const pie = await post('/api/pie', { ...state, selected_points: selectedPoints });
            Plotly.react('pie', pie.body.data, pie.body.layout);

            const map = await post('/api/map', state);
            if (map.ok) {
                el('map-error').textContent = '';
                await Plotly.react('map', map.body.data, map.body.layout);
            } else {
                el('map-error').textContent = map.body.error;
            }
        }

        async function refreshRange() {
            const range = (await post('/api/amount-range', controls())).body;
            if (range) {
                for (const id of ['amount-low', 'amount-high']) {
                    el(id).min = range.min;
                    el(id).max = range.max;
                }
                el('amount-low').value = range.value[0];
                el('amount-high').value = range.value[1];
                el('amount-marks').replaceChildren(...Object.keys(range.marks).map(k => {
                    const option = document.createElement('option');
                    option.value = k;
                    option.label = range.marks[k];
                    return option;
                }));
            }
            await refreshCharts();
        }

        async function init() {
            const layout = await (await fetch('/api/layout')).json();
            if (layout.min_date) el('start-date').value = layout.min_date.slice(0, 10);
            if (layout.max_date) el('end-date').value = layout.max_date.slice(0, 10);
            renderRows(layout.rows);

            el('start-date').addEventListener('change', refreshRange);
            el('end-date').addEventListener('change', refreshRange);
            el('amount-low').addEventListener('change', refreshCharts);
            el('amount-high').addEventListener('change', refreshCharts);
            el('table-filter').addEventListener('input', () => renderRows());
            document.querySelectorAll('th[data-key]').forEach(th => th.addEventListener('click', () => {
                sortAsc = sortKey === th.dataset.key ? !sortAsc : true;
                sortKey = th.dataset.key;
                renderRows();
            }));

            await refreshRange();

            // Only bound once the map has rendered
            if (el('map').on) {
                el('map').on('plotly_selected', (event) => {
                    selectedPoints = event
                        ? { points: event.points.map(p => ({ lat: p.lat, lon: p.lon })) }
                        : null;
                    refreshCharts();
                });
            }
        }

        init();
    </script>
</body>
</html>
"#;
