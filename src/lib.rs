// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体：任务、断点和帖子引用
pub mod domain;

/// 基础设施模块
///
/// 提供断点存储、身份池和采集结果存储
pub mod infrastructure;

/// 队列模块
///
/// 实现共享任务队列的领取/登记协议
pub mod queue;

/// 会话模块
///
/// 实现页面驱动、故障分类和采集会话
pub mod session;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现采集编排状态机
pub mod workers;
