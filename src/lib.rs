/*!
# Asset Dashboard

A browser-based dashboard over asset inventory spreadsheets, built in Rust.

## Overview

A user uploads an `.xlsx` or `.xls` workbook describing assets (ASET, BULAN,
PERSEN, SISA PERSENTASE, MAXIMO, LTB, GAP, Status, Class Description and
Changed Date). The first sheet is read into an immutable table, and every page
view filters that table and aggregates it into group counts, percentage pairs,
KPI series and GAP totals that are drawn as charts.

## Architecture

### Data Layer
- **loader**: Reads the first sheet with calamine, normalizes headers and
  derives the changed month from "Changed Date"
- **record** / **table**: The typed asset row, filter selections and the table
  they apply to

### Aggregation Layer
- **aggregate**: Pure functions from a row subset to chart-ready tables
- **view**: Home and "Distribusi Aset" page models built from a table and a filter

### Web Layer (feature `web`)
- **app**: axum routes, handlebars page rendering and the upload flow
- **session**: One uploaded table per browser session
- **graph**: PNG charts rendered with plotters
- **downloader**: CSV and XLSX export of the filtered rows

## REST API Endpoints

- `/` - Dashboard page (`page=Home` or `page=News`)
- `/upload` - Workbook upload (multipart field `file`)
- `/api/home`, `/api/distribution` - Page models as JSON
- `/chart/{name}.png` - Rendered charts
- `/export.xlsx`, `/export.csv` - Filtered rows
*/

pub mod aggregate;
pub mod config;
pub mod error;
pub mod loader;
pub mod record;
pub mod table;
pub mod view;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod downloader;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod session;

pub use error::{Error, Result};
