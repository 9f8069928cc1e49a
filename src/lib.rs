/*!
# Klinik Theresia Patient Satisfaction Survey

A small web application that collects patient satisfaction surveys for a
primary-care clinic and gives the clinic's administrator a dashboard over the
answers.

## Overview

Patients fill in a single form: name, gender, age bracket, the service they
used (general or BPJS), ten Likert questions for that service, three optional
overall questions and a free-text suggestion. Every submission is stored in a
local SQLite file and answered with a thank-you note carrying the patient's
average score and sentiment.

The administrator logs in with a shared password and sees every table of the
survey for a chosen date range, a K-Means grouping of respondents into
negative, neutral and positive sentiment, and can download everything as one
Excel workbook.

## Architecture

### Web Layer (feature `web`)
- **Technologies**: axum, handlebars, plotters
- **Key Components**:
  - Page router - survey form, home, about and admin pages sharing one layout
  - Admin login - password check and cookie sessions
  - Cluster chart - inline SVG scatter plot of the clustered respondents

### Core Layer
- **survey**: Questionnaire catalogue, Likert scale and form validation
- **store**: SQLite persistence of respondents, answers and suggestions
- **analysis**: Date filtering, joins and K-Means sentiment clustering (linfa)
- **table**: Tabular view of the data shared by the dashboard and the exports
- **downloader**: XLSX and CSV export

## Modules

- **survey**: Questions, answer scale and submission validation
- **store**: Database schema, inserts and loading
- **analysis**: Dashboard data and clustering
- **table**: Generic rows and cells
- **downloader**: Workbook and CSV writers
- **config**: Environment configuration
- **error**: Application error type
- **graph**: Cluster scatter chart
- **login**: Admin authentication and session management
- **page**: Page selection and HTML rendering
- **app**: Routing and middleware

## Usage

`survey-web` serves the application, `survey-export` dumps an existing
database to a workbook or a single table to CSV.
*/

pub mod analysis;
pub mod config;
pub mod downloader;
pub mod error;
pub mod store;
pub mod survey;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod page;

pub use error::AppError;
