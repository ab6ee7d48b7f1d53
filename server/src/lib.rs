//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reactive narrative engine
//!
//! A world director turns a snapshot of the world into validated actions,
//! narration and directives; character agents turn each directive into an
//! emotion/trust update and a line of dialogue.

pub mod agent;
pub mod config;
pub mod director;
pub mod dispatch;
pub mod llm;
pub mod postprocess;
pub mod schema;
pub mod tick;
pub mod triggers;
